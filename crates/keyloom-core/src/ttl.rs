use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::field::FieldModel;
use crate::types::TtlSource;

/// Expiration policy derived from a source event and a duration field.
///
/// The descriptor only encodes the rule; the runtime layer computes the
/// actual expiration (source event timestamp + duration value) and refreshes
/// it whenever the source timestamp changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TtlPolicy {
    pub source: TtlSource,
    pub field: String,
}

impl TtlPolicy {
    /// Rebind the duration-field reference after a rename.
    pub fn rename_field(&mut self, old: &str, new: &str) {
        if self.field == old {
            self.field = new.to_string();
        }
    }
}

/// Resolve a TTL declaration against the available field set.
pub fn resolve_ttl(item_type: &str, source: TtlSource, field: &str, fields: &[FieldModel]) -> Result<TtlPolicy> {
    let target = fields
        .iter()
        .find(|candidate| candidate.name == field)
        .ok_or_else(|| Error::UnknownTtlField {
            item_type: item_type.to_string(),
            field: field.to_string(),
        })?;

    if !target.field_type.is_duration() {
        return Err(Error::InvalidTtlFieldType {
            item_type: item_type.to_string(),
            field: field.to_string(),
            found: target.field_type.type_name().to_string(),
        });
    }

    Ok(TtlPolicy {
        source,
        field: field.to_string(),
    })
}
