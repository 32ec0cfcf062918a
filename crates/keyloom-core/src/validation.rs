use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::schema::{ItemType, SchemaDescriptor};

/// Validate internal consistency of a single item type.
///
/// This checks:
/// - field names are unique within the type
/// - at least one key path is declared
/// - every key path placeholder resolves to a declared field
/// - the TTL policy references an existing, duration-typed field
pub fn validate_item_type(item: &ItemType) -> Result<()> {
    let mut fields = BTreeSet::new();
    for field in &item.fields {
        if !fields.insert(field.name.as_str()) {
            return Err(Error::InvalidSchema(format!(
                "duplicate field name: {}.{}",
                item.name, field.name
            )));
        }
        field.validate(&item.name)?;
    }

    if item.key_paths.is_empty() {
        return Err(Error::InvalidSchema(format!(
            "item type '{}' declares no key path",
            item.name
        )));
    }

    for key_path in &item.key_paths {
        let mut bound = BTreeSet::new();
        for name in key_path.field_names() {
            if !fields.contains(name) {
                return Err(Error::UnknownKeyPathField {
                    item_type: item.name.clone(),
                    template: key_path.raw.clone(),
                    field: name.to_string(),
                });
            }
            if !bound.insert(name) {
                return Err(Error::DuplicateKeyPathField {
                    item_type: item.name.clone(),
                    template: key_path.raw.clone(),
                    field: name.to_string(),
                });
            }
        }
    }

    if let Some(ttl) = &item.ttl {
        let field = item
            .field(&ttl.field)
            .ok_or_else(|| Error::UnknownTtlField {
                item_type: item.name.clone(),
                field: ttl.field.clone(),
            })?;
        if !field.field_type.is_duration() {
            return Err(Error::InvalidTtlFieldType {
                item_type: item.name.clone(),
                field: ttl.field.clone(),
                found: field.field_type.type_name().to_string(),
            });
        }
    }

    Ok(())
}

/// Validate internal consistency of a full descriptor snapshot.
///
/// Any schema version must pass this standalone; the migration engine
/// re-runs it after every applied step.
pub fn validate_descriptor(descriptor: &SchemaDescriptor) -> Result<()> {
    let mut names = BTreeSet::new();
    for item in &descriptor.item_types {
        if !names.insert(item.name.as_str()) {
            return Err(Error::DuplicateTypeName {
                name: item.name.clone(),
            });
        }
        validate_item_type(item)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldModel;
    use crate::keypath::compile_key_paths;
    use crate::ttl::TtlPolicy;
    use crate::types::{FieldType, TtlSource};
    use crate::DESCRIPTOR_VERSION;

    fn item(name: &str) -> ItemType {
        let fields = vec![FieldModel::new("id", FieldType::Uuid)];
        let key_paths =
            compile_key_paths(name, &[format!("/{}-:id", name.to_lowercase())], &fields).unwrap();
        ItemType {
            name: name.to_string(),
            fields,
            key_paths,
            ttl: None,
        }
    }

    #[test]
    fn accepts_valid_descriptor() {
        let descriptor = SchemaDescriptor {
            descriptor_version: DESCRIPTOR_VERSION.to_string(),
            item_types: vec![item("User"), item("Resource")],
            fingerprint: None,
        };
        assert!(validate_descriptor(&descriptor).is_ok());
    }

    #[test]
    fn rejects_duplicate_type_names() {
        let descriptor = SchemaDescriptor {
            descriptor_version: DESCRIPTOR_VERSION.to_string(),
            item_types: vec![item("User"), item("User")],
            fingerprint: None,
        };
        let err = validate_descriptor(&descriptor).unwrap_err();
        assert!(matches!(err, Error::DuplicateTypeName { ref name } if name == "User"));
    }

    #[test]
    fn rejects_duplicate_field_names() {
        let mut bad = item("User");
        bad.fields.push(FieldModel::new("id", FieldType::String));
        let err = validate_item_type(&bad).unwrap_err();
        assert!(matches!(err, Error::InvalidSchema(_)));
    }

    #[test]
    fn rejects_dangling_key_path_reference() {
        let mut bad = item("User");
        bad.fields[0].name = "user_id".to_string();
        let err = validate_item_type(&bad).unwrap_err();
        assert!(matches!(err, Error::UnknownKeyPathField { ref field, .. } if field == "id"));
    }

    #[test]
    fn rejects_dangling_ttl_reference() {
        let mut bad = item("Lease");
        bad.ttl = Some(TtlPolicy {
            source: TtlSource::FromLastModified,
            field: "duration".to_string(),
        });
        let err = validate_item_type(&bad).unwrap_err();
        assert!(matches!(err, Error::UnknownTtlField { ref field, .. } if field == "duration"));
    }
}
