use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::{FieldType, InitialValue, MetadataSource};

/// Compiled field declaration for one item type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldModel {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether the field must be present on every record.
    pub required: bool,
    /// Generator applied when a record is first written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<InitialValue>,
    /// Metadata event the field value is derived from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_metadata: Option<MetadataSource>,
    /// Boolean predicate over the field value, evaluated by the runtime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid: Option<String>,
    /// Default applied at read time to historical records lacking the field.
    /// Recorded by migrations; descriptor metadata, never a data mutation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backfill: Option<Value>,
}

impl FieldModel {
    /// Create a required field with no generators or validation.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: true,
            initial_value: None,
            from_metadata: None,
            valid: None,
            backfill: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_initial_value(mut self, initial_value: InitialValue) -> Self {
        self.initial_value = Some(initial_value);
        self
    }

    pub fn with_metadata(mut self, source: MetadataSource) -> Self {
        self.from_metadata = Some(source);
        self
    }

    pub fn with_valid(mut self, expression: impl Into<String>) -> Self {
        self.valid = Some(expression.into());
        self
    }

    /// Check internal consistency of the declaration.
    ///
    /// Fails when the initial-value generator is incompatible with the
    /// declared type, when a metadata source is bound to a field whose type
    /// does not match the metadata's intrinsic type, or when the validation
    /// expression references an undefined symbol.
    pub fn validate(&self, item_type: &str) -> Result<()> {
        if let Some(initial_value) = self.initial_value {
            match initial_value {
                InitialValue::Uuid => {
                    if !self.field_type.is_uuid() {
                        return Err(self.invalid(
                            item_type,
                            format!(
                                "initial value generator 'uuid' cannot populate a {}-typed field",
                                self.field_type.primitive().type_name()
                            ),
                        ));
                    }
                }
            }
        }

        if let Some(source) = self.from_metadata {
            if self.field_type.primitive() != source.intrinsic_type().primitive() {
                return Err(self.invalid(
                    item_type,
                    format!(
                        "metadata source carries {} but the field is {}-typed",
                        source.intrinsic_type().type_name(),
                        self.field_type.primitive().type_name()
                    ),
                ));
            }
        }

        if let Some(expression) = &self.valid {
            self.check_expression(item_type, expression)?;
        }

        Ok(())
    }

    /// Scope-check a validation expression.
    ///
    /// Only `this` is in scope as a value root; method names invoked on it
    /// are resolved by the runtime layer and left unchecked here.
    fn check_expression(&self, item_type: &str, expression: &str) -> Result<()> {
        if expression.trim().is_empty() {
            return Err(self.invalid(item_type, "validation expression is empty".to_string()));
        }

        for symbol in root_symbols(expression) {
            if !matches!(symbol.as_str(), "this" | "true" | "false" | "null") {
                return Err(self.invalid(
                    item_type,
                    format!("validation expression references undefined symbol '{symbol}'"),
                ));
            }
        }

        Ok(())
    }

    fn invalid(&self, item_type: &str, reason: String) -> Error {
        Error::InvalidFieldDefinition {
            item_type: item_type.to_string(),
            field: self.name.clone(),
            reason,
        }
    }
}

/// Collect root identifiers from an expression, skipping string literals and
/// identifiers reached through member access (`this.matches` yields only
/// `this`).
fn root_symbols(expression: &str) -> Vec<String> {
    let mut symbols = Vec::new();
    let mut chars = expression.char_indices().peekable();
    let bytes = expression.as_bytes();

    while let Some((idx, ch)) = chars.next() {
        if ch == '"' || ch == '\'' {
            let quote = ch;
            while let Some((_, inner)) = chars.next() {
                if inner == '\\' {
                    chars.next();
                } else if inner == quote {
                    break;
                }
            }
            continue;
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            let mut end = idx + ch.len_utf8();
            while let Some((next_idx, next)) = chars.peek().copied() {
                if next.is_ascii_alphanumeric() || next == '_' {
                    end = next_idx + next.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }

            let preceded_by_dot = expression[..idx]
                .trim_end()
                .ends_with('.');
            // Digits directly before an identifier belong to numeric
            // literals such as `1e9`.
            let preceded_by_digit = idx > 0 && bytes[idx - 1].is_ascii_digit();
            if !preceded_by_dot && !preceded_by_digit {
                symbols.push(expression[idx..end].to_string());
            }
        }
    }

    symbols
}
