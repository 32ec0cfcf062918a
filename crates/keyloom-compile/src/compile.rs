use std::collections::BTreeMap;

use jsonschema::JSONSchema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use keyloom_core::{
    compile_key_paths, resolve_ttl, Error as CoreError, FieldModel, FieldType, InitialValue,
    ItemType, MetadataSource, SchemaDescriptor, TtlSource, TypeRegistry,
};
use keyloom_migrate::{FieldOp, MigrationChain, MigrationEngine, MigrationStep, TypeChange};

use crate::errors::{CompileError, IssueSeverity, Result, ValidationIssue, ValidationReport};
use crate::model::{
    FieldDef, FieldOpDef, ItemTypeDef, MigrationDef, SchemaDefinition, TypeAliasDef,
};
use crate::schema::definition_json_schema;

/// Output artifact of a compilation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CompiledSchema {
    /// Current descriptor with its fingerprint stamped.
    pub current: SchemaDescriptor,
    /// Full ordered version chain; version 0 is the base compiled from the
    /// declarations, later entries follow the migrations.
    pub chain: MigrationChain,
}

/// Validate a definition JSON document against the emitted JSON Schema.
pub fn validate_definition_json(definition_json: &Value) -> Result<ValidationReport> {
    let schema_value = serde_json::to_value(definition_json_schema())?;
    let compiled =
        JSONSchema::compile(&schema_value).map_err(|err| CompileError::Schema(err.to_string()))?;

    let mut report = ValidationReport::default();

    if let Err(errors) = compiled.validate(definition_json) {
        for error in errors {
            let path = normalized_json_pointer(&error.instance_path.to_string());
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "schema_violation",
                path,
                error.to_string(),
                None,
            ));
        }
    }

    Ok(report)
}

/// Compile a definition JSON document end-to-end, returning structured
/// issues on failure.
pub fn compile_json(definition_json: &Value) -> std::result::Result<CompiledSchema, ValidationReport> {
    let structural = match validate_definition_json(definition_json) {
        Ok(report) => report,
        Err(err) => {
            let mut report = ValidationReport::default();
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "schema_validation_error",
                "/",
                err.to_string(),
                None,
            ));
            return Err(report);
        }
    };

    if !structural.is_ok() {
        return Err(structural);
    }

    let definition: SchemaDefinition = match serde_json::from_value(definition_json.clone()) {
        Ok(definition) => definition,
        Err(err) => {
            let mut report = ValidationReport::default();
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "invalid_definition_json",
                "/",
                err.to_string(),
                None,
            ));
            return Err(report);
        }
    };

    compile_definition(&definition).map_err(|err| {
        let mut report = ValidationReport::default();
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "definition_error",
            "/",
            err.to_string(),
            None,
        ));
        report
    })
}

/// Compile a parsed definition document into the frozen descriptor and the
/// migration version chain.
///
/// Single-pass, synchronous, no I/O; each run constructs a fresh registry,
/// so identical input always yields an identical artifact.
pub fn compile_definition(definition: &SchemaDefinition) -> Result<CompiledSchema> {
    let aliases = resolve_type_aliases(&definition.type_aliases)?;

    let mut registry = TypeRegistry::new();
    for item_def in &definition.item_types {
        let item = compile_item_type(item_def, &aliases)?;
        debug!(
            item_type = %item.name,
            fields = item.fields.len(),
            key_paths = item.key_paths.len(),
            "item type compiled"
        );
        registry.register(item)?;
    }
    let base = registry.freeze();

    let steps = resolve_migrations(&definition.migrations, &aliases)?;
    let chain = MigrationEngine::new().apply(&base, &steps)?;
    let current = chain.current().descriptor.clone().with_fingerprint()?;

    info!(
        item_types = current.item_types.len(),
        versions = chain.versions.len(),
        fingerprint = current.fingerprint.as_deref().unwrap_or_default(),
        "schema compiled"
    );

    Ok(CompiledSchema { current, chain })
}

/// Resolve a primitive type tag; camelCase and snake_case spellings are
/// both accepted on the authoring surface.
fn builtin_type(tag: &str) -> Option<FieldType> {
    match tag {
        "string" => Some(FieldType::String),
        "uuid" => Some(FieldType::Uuid),
        "bool" => Some(FieldType::Bool),
        "int" => Some(FieldType::Int),
        "timestampMilliseconds" | "timestamp_milliseconds" => {
            Some(FieldType::TimestampMilliseconds)
        }
        "durationSeconds" | "duration_seconds" => Some(FieldType::DurationSeconds),
        _ => None,
    }
}

fn resolve_type_aliases(defs: &[TypeAliasDef]) -> Result<BTreeMap<String, FieldType>> {
    let mut aliases: BTreeMap<String, FieldType> = BTreeMap::new();

    for def in defs {
        if builtin_type(&def.name).is_some() || aliases.contains_key(&def.name) {
            return Err(
                CoreError::InvalidSchema(format!("duplicate type alias: {}", def.name)).into(),
            );
        }
        let target = builtin_type(&def.of)
            .or_else(|| aliases.get(&def.of).cloned())
            .ok_or_else(|| {
                CoreError::InvalidSchema(format!(
                    "type alias '{}' targets unknown type '{}'",
                    def.name, def.of
                ))
            })?;
        aliases.insert(
            def.name.clone(),
            FieldType::Alias {
                name: def.name.clone(),
                of: Box::new(target),
            },
        );
    }

    Ok(aliases)
}

fn resolve_field(
    item_type: &str,
    def: &FieldDef,
    aliases: &BTreeMap<String, FieldType>,
) -> Result<FieldModel> {
    let invalid = |reason: String| -> CompileError {
        CoreError::InvalidFieldDefinition {
            item_type: item_type.to_string(),
            field: def.name.clone(),
            reason,
        }
        .into()
    };

    let field_type = builtin_type(&def.field_type)
        .or_else(|| aliases.get(&def.field_type).cloned())
        .ok_or_else(|| invalid(format!("unknown type tag '{}'", def.field_type)))?;

    let initial_value = match def.initial_value.as_deref() {
        None => None,
        Some("uuid") => Some(InitialValue::Uuid),
        Some(other) => {
            return Err(invalid(format!(
                "unrecognized initial value generator '{other}'"
            )));
        }
    };

    let from_metadata = match def.from_metadata.as_deref() {
        None => None,
        Some(token) => Some(
            token
                .parse::<MetadataSource>()
                .map_err(|_| invalid(format!("unrecognized metadata source '{token}'")))?,
        ),
    };

    let field = FieldModel {
        name: def.name.clone(),
        field_type,
        required: def.required,
        initial_value,
        from_metadata,
        valid: def.valid.clone(),
        backfill: None,
    };
    field.validate(item_type)?;
    Ok(field)
}

fn compile_item_type(
    def: &ItemTypeDef,
    aliases: &BTreeMap<String, FieldType>,
) -> Result<ItemType> {
    let fields: Vec<FieldModel> = def
        .fields
        .iter()
        .map(|field_def| resolve_field(&def.name, field_def, aliases))
        .collect::<Result<_>>()?;

    let key_paths = compile_key_paths(&def.name, &def.key_path.templates(), &fields)?;

    let ttl = match &def.ttl {
        None => None,
        Some(ttl_def) => {
            let source =
                ttl_def
                    .source
                    .parse::<TtlSource>()
                    .map_err(|_| CoreError::InvalidTtlSource {
                        item_type: def.name.clone(),
                        source_event: ttl_def.source.clone(),
                    })?;
            Some(resolve_ttl(&def.name, source, &ttl_def.field, &fields)?)
        }
    };

    Ok(ItemType {
        name: def.name.clone(),
        fields,
        key_paths,
        ttl,
    })
}

fn resolve_migrations(
    defs: &[MigrationDef],
    aliases: &BTreeMap<String, FieldType>,
) -> Result<Vec<MigrationStep>> {
    defs.iter()
        .map(|def| {
            let changes = def
                .changes
                .iter()
                .map(|change| {
                    let ops = change
                        .ops
                        .iter()
                        .map(|op| resolve_op(&change.item_type, op, aliases))
                        .collect::<Result<Vec<_>>>()?;
                    Ok(TypeChange {
                        item_type: change.item_type.clone(),
                        ops,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(MigrationStep {
                version: def.version,
                description: def.description.clone(),
                changes,
            })
        })
        .collect()
}

fn resolve_op(
    item_type: &str,
    op: &FieldOpDef,
    aliases: &BTreeMap<String, FieldType>,
) -> Result<FieldOp> {
    Ok(match op {
        FieldOpDef::AddField { field } => FieldOp::AddField {
            field: resolve_field(item_type, field, aliases)?,
        },
        FieldOpDef::RenameField { from, to } => FieldOp::RenameField {
            from: from.clone(),
            to: to.clone(),
        },
        FieldOpDef::MarkNotRequired { field, backfill } => FieldOp::MarkNotRequired {
            field: field.clone(),
            backfill: backfill.clone(),
        },
    })
}

fn normalized_json_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{KeyPathDef, TtlDef};

    fn field(name: &str, field_type: &str) -> FieldDef {
        FieldDef {
            name: name.to_string(),
            field_type: field_type.to_string(),
            required: true,
            initial_value: None,
            from_metadata: None,
            valid: None,
        }
    }

    fn user_def() -> ItemTypeDef {
        let mut id = field("id", "UserID");
        id.initial_value = Some("uuid".to_string());
        let mut email = field("email", "string");
        email.valid = Some("this.matches(\"[^@]+@[^@]+\")".to_string());
        let mut created_at = field("createdAt", "timestampMilliseconds");
        created_at.from_metadata = Some("createdAtTime".to_string());

        ItemTypeDef {
            name: "User".to_string(),
            key_path: KeyPathDef::Many(vec![
                "/user-:id".to_string(),
                "/user_email-:email".to_string(),
            ]),
            fields: vec![id, field("displayName", "string"), email, created_at],
            ttl: None,
        }
    }

    fn definition() -> SchemaDefinition {
        SchemaDefinition {
            type_aliases: vec![TypeAliasDef {
                name: "UserID".to_string(),
                of: "uuid".to_string(),
            }],
            item_types: vec![user_def()],
            migrations: Vec::new(),
        }
    }

    #[test]
    fn compiles_definition_with_alias_and_alternate_paths() {
        let compiled = compile_definition(&definition()).expect("compile");
        let user = compiled.current.item_type("User").expect("User");

        assert_eq!(user.key_paths.len(), 2);
        assert_eq!(user.canonical_key_path().unwrap().raw, "/user-:id");
        assert_eq!(user.field("id").unwrap().field_type.type_name(), "UserID");
        assert!(user.field("id").unwrap().field_type.is_uuid());
        assert!(compiled.current.fingerprint.is_some());
        assert_eq!(compiled.chain.versions.len(), 1);
    }

    #[test]
    fn unknown_type_tag_is_rejected() {
        let mut definition = definition();
        definition.item_types[0].fields[0].field_type = "varchar".to_string();
        let err = compile_definition(&definition).unwrap_err();
        assert!(err.to_string().contains("unknown type tag 'varchar'"));
    }

    #[test]
    fn unknown_metadata_source_is_rejected() {
        let mut definition = definition();
        definition.item_types[0].fields[3].from_metadata = Some("deletedAtTime".to_string());
        let err = compile_definition(&definition).unwrap_err();
        assert!(err.to_string().contains("deletedAtTime"));
    }

    #[test]
    fn unknown_ttl_source_is_rejected() {
        let mut definition = definition();
        definition.item_types[0]
            .fields
            .push(FieldDef {
                required: false,
                ..field("duration", "durationSeconds")
            });
        definition.item_types[0].ttl = Some(TtlDef {
            source: "fromTouch".to_string(),
            field: "duration".to_string(),
        });
        let err = compile_definition(&definition).unwrap_err();
        assert!(matches!(
            err,
            CompileError::Definition(CoreError::InvalidTtlSource { .. })
        ));
    }

    #[test]
    fn duplicate_item_type_name_is_rejected() {
        let mut definition = definition();
        definition.item_types.push(user_def());
        let err = compile_definition(&definition).unwrap_err();
        assert!(matches!(
            err,
            CompileError::Definition(CoreError::DuplicateTypeName { .. })
        ));
    }

    #[test]
    fn alias_of_unknown_type_is_rejected() {
        let mut definition = definition();
        definition.type_aliases[0].of = "varchar".to_string();
        let err = compile_definition(&definition).unwrap_err();
        assert!(err.to_string().contains("unknown type"));
    }
}
