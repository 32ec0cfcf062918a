use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::field::FieldModel;
use crate::types::FieldType;

/// One compiled run of a key path template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PathToken {
    /// Literal text copied verbatim into the encoded key.
    Literal { text: String },
    /// Placeholder bound to a field of the owning item type.
    Field {
        name: String,
        #[serde(rename = "type")]
        field_type: FieldType,
    },
}

/// Compiled key path template.
///
/// The raw template uses `:placeholder` syntax
/// (`/user-:user_id/lease-:id`). Arity is the segment count; together with
/// the placeholder type sequence it gives the runtime layer what it needs
/// to route lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct KeyPathTemplate {
    pub raw: String,
    pub arity: usize,
    pub tokens: Vec<PathToken>,
}

impl KeyPathTemplate {
    /// Names of the fields bound by this template, in path order.
    pub fn field_names(&self) -> Vec<&str> {
        self.tokens
            .iter()
            .filter_map(|token| match token {
                PathToken::Field { name, .. } => Some(name.as_str()),
                PathToken::Literal { .. } => None,
            })
            .collect()
    }

    /// Placeholder type sequence, in path order.
    pub fn placeholder_types(&self) -> Vec<&FieldType> {
        self.tokens
            .iter()
            .filter_map(|token| match token {
                PathToken::Field { field_type, .. } => Some(field_type),
                PathToken::Literal { .. } => None,
            })
            .collect()
    }

    pub fn references_field(&self, field: &str) -> bool {
        self.field_names().iter().any(|name| *name == field)
    }

    /// Rebind every placeholder on `old` to `new`, regenerating the raw
    /// template so no dangling reference remains.
    pub fn rename_field(&mut self, old: &str, new: &str) {
        for token in &mut self.tokens {
            if let PathToken::Field { name, .. } = token {
                if name == old {
                    *name = new.to_string();
                }
            }
        }
        self.raw = self.render_raw();
    }

    fn render_raw(&self) -> String {
        let mut raw = String::new();
        for token in &self.tokens {
            match token {
                PathToken::Literal { text } => raw.push_str(text),
                PathToken::Field { name, .. } => {
                    raw.push(':');
                    raw.push_str(name);
                }
            }
        }
        raw
    }
}

/// Compile key path templates against the available field set.
///
/// The first template is canonical for the primary record identity; the
/// remainder are alternate lookup paths kept in declaration order.
/// Overlapping prefixes across templates are not deduplicated — keeping
/// alternate paths consistent under updates is the runtime layer's
/// responsibility.
pub fn compile_key_paths(
    item_type: &str,
    templates: &[String],
    fields: &[FieldModel],
) -> Result<Vec<KeyPathTemplate>> {
    if templates.is_empty() {
        return Err(Error::InvalidSchema(format!(
            "item type '{item_type}' declares no key path"
        )));
    }

    templates
        .iter()
        .map(|template| compile_template(item_type, template, fields))
        .collect()
}

fn compile_template(
    item_type: &str,
    template: &str,
    fields: &[FieldModel],
) -> Result<KeyPathTemplate> {
    let malformed = |reason: &str| Error::MalformedKeyPath {
        item_type: item_type.to_string(),
        template: template.to_string(),
        reason: reason.to_string(),
    };

    if !template.starts_with('/') {
        return Err(malformed("key path must start with '/'"));
    }

    let segments: Vec<&str> = template[1..].split('/').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(malformed("key path contains an empty segment"));
    }
    let arity = segments.len();

    let mut tokens = Vec::new();
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut literal = String::new();
    let mut chars = template.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if ch != ':' {
            literal.push(ch);
            continue;
        }

        let mut end = idx + 1;
        while let Some((next_idx, next)) = chars.peek().copied() {
            if next.is_ascii_alphanumeric() || next == '_' {
                end = next_idx + next.len_utf8();
                chars.next();
            } else {
                break;
            }
        }

        let name = &template[idx + 1..end];
        if name.is_empty() {
            return Err(malformed("placeholder ':' is missing a field name"));
        }

        if !literal.is_empty() {
            tokens.push(PathToken::Literal {
                text: std::mem::take(&mut literal),
            });
        }

        let field = fields
            .iter()
            .find(|field| field.name == name)
            .ok_or_else(|| Error::UnknownKeyPathField {
                item_type: item_type.to_string(),
                template: template.to_string(),
                field: name.to_string(),
            })?;

        if !seen.insert(field.name.as_str()) {
            return Err(Error::DuplicateKeyPathField {
                item_type: item_type.to_string(),
                template: template.to_string(),
                field: name.to_string(),
            });
        }

        tokens.push(PathToken::Field {
            name: field.name.clone(),
            field_type: field.field_type.clone(),
        });
    }

    if !literal.is_empty() {
        tokens.push(PathToken::Literal { text: literal });
    }

    Ok(KeyPathTemplate {
        raw: template.to_string(),
        arity,
        tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lease_fields() -> Vec<FieldModel> {
        vec![
            FieldModel::new("id", FieldType::Uuid),
            FieldModel::new("user_id", FieldType::Uuid),
            FieldModel::new("res_id", FieldType::Uuid),
        ]
    }

    #[test]
    fn compiles_multi_segment_template() {
        let templates = vec!["/user-:user_id/res-:res_id/lease-:id".to_string()];
        let compiled = compile_key_paths("Lease", &templates, &lease_fields()).unwrap();

        assert_eq!(compiled.len(), 1);
        let path = &compiled[0];
        assert_eq!(path.arity, 3);
        assert_eq!(path.field_names(), vec!["user_id", "res_id", "id"]);
        assert_eq!(path.tokens.len(), 6);
        assert_eq!(
            path.tokens[0],
            PathToken::Literal {
                text: "/user-".to_string()
            }
        );
    }

    #[test]
    fn first_template_is_canonical_and_order_is_preserved() {
        let templates = vec![
            "/user-:user_id/res-:res_id/lease-:id".to_string(),
            "/res-:res_id/lease-:id".to_string(),
            "/lease-:id".to_string(),
        ];
        let compiled = compile_key_paths("Lease", &templates, &lease_fields()).unwrap();
        assert_eq!(compiled[0].arity, 3);
        assert_eq!(compiled[1].arity, 2);
        assert_eq!(compiled[2].arity, 1);
    }

    #[test]
    fn unknown_placeholder_is_rejected() {
        let templates = vec!["/lease-:lease_id".to_string()];
        let err = compile_key_paths("Lease", &templates, &lease_fields()).unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownKeyPathField { ref field, .. } if field == "lease_id"
        ));
    }

    #[test]
    fn duplicate_placeholder_in_one_template_is_rejected() {
        let templates = vec!["/user-:user_id/again-:user_id".to_string()];
        let err = compile_key_paths("Lease", &templates, &lease_fields()).unwrap_err();
        assert!(matches!(
            err,
            Error::DuplicateKeyPathField { ref field, .. } if field == "user_id"
        ));
    }

    #[test]
    fn same_field_across_templates_is_allowed() {
        let templates = vec!["/lease-:id".to_string(), "/archive/lease-:id".to_string()];
        assert!(compile_key_paths("Lease", &templates, &lease_fields()).is_ok());
    }

    #[test]
    fn missing_leading_slash_is_malformed() {
        let templates = vec!["lease-:id".to_string()];
        let err = compile_key_paths("Lease", &templates, &lease_fields()).unwrap_err();
        assert!(matches!(err, Error::MalformedKeyPath { .. }));
    }

    #[test]
    fn empty_placeholder_name_is_malformed() {
        let templates = vec!["/lease-:".to_string()];
        let err = compile_key_paths("Lease", &templates, &lease_fields()).unwrap_err();
        assert!(matches!(err, Error::MalformedKeyPath { .. }));
    }

    #[test]
    fn empty_segment_is_malformed() {
        let templates = vec!["/lease-:id//extra".to_string()];
        let err = compile_key_paths("Lease", &templates, &lease_fields()).unwrap_err();
        assert!(matches!(err, Error::MalformedKeyPath { .. }));
    }

    #[test]
    fn rename_rewrites_tokens_and_raw() {
        let templates = vec!["/res-:res_id/lease-:id".to_string()];
        let mut compiled = compile_key_paths("Lease", &templates, &lease_fields()).unwrap();
        compiled[0].rename_field("res_id", "resource_id");

        assert_eq!(compiled[0].raw, "/res-:resource_id/lease-:id");
        assert!(compiled[0].references_field("resource_id"));
        assert!(!compiled[0].references_field("res_id"));
    }
}
