use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::field::FieldModel;
use crate::keypath::KeyPathTemplate;
use crate::ttl::TtlPolicy;

/// A named record schema: ordered fields, compiled key paths, optional TTL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ItemType {
    pub name: String,
    /// Ordered field set; names are unique within the type.
    pub fields: Vec<FieldModel>,
    /// The first template is canonical; the rest are alternate lookup paths
    /// in declaration order.
    pub key_paths: Vec<KeyPathTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<TtlPolicy>,
}

impl ItemType {
    pub fn field(&self, name: &str) -> Option<&FieldModel> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut FieldModel> {
        self.fields.iter_mut().find(|field| field.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Canonical key path producing the primary record identity.
    pub fn canonical_key_path(&self) -> Option<&KeyPathTemplate> {
        self.key_paths.first()
    }

    /// Rename a field and rewrite every key path and TTL reference to it.
    ///
    /// The caller is responsible for legality checks (the field must exist,
    /// the new name must be free); a dangling reference after rename is a
    /// defect caught by `validate_item_type`.
    pub fn rename_field(&mut self, old: &str, new: &str) {
        if let Some(field) = self.field_mut(old) {
            field.name = new.to_string();
        }
        for key_path in &mut self.key_paths {
            key_path.rename_field(old, new);
        }
        if let Some(ttl) = &mut self.ttl {
            ttl.rename_field(old, new);
        }
    }
}

/// Frozen, consumable output of schema compilation.
///
/// This is the contract consumed by the storage/runtime layer; it maps each
/// item type name to its field set, ordered key paths, and TTL policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SchemaDescriptor {
    /// Contract version for this descriptor format.
    pub descriptor_version: String,
    /// Item types in registration order.
    pub item_types: Vec<ItemType>,
    /// SHA-256 over the canonical JSON of the descriptor body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

impl SchemaDescriptor {
    pub fn item_type(&self, name: &str) -> Option<&ItemType> {
        self.item_types.iter().find(|item| item.name == name)
    }

    pub fn item_type_mut(&mut self, name: &str) -> Option<&mut ItemType> {
        self.item_types.iter_mut().find(|item| item.name == name)
    }

    /// Compute the fingerprint of the descriptor body.
    ///
    /// The fingerprint field itself is excluded, so recomputing over a
    /// stamped descriptor is stable.
    pub fn compute_fingerprint(&self) -> Result<String> {
        let mut body = self.clone();
        body.fingerprint = None;
        let canonical = serde_json::to_vec(&body)
            .map_err(|err| Error::InvalidSchema(format!("descriptor serialization failed: {err}")))?;
        let digest = Sha256::digest(&canonical);
        Ok(hex::encode(digest))
    }

    /// Return the descriptor with its fingerprint stamped.
    pub fn with_fingerprint(mut self) -> Result<Self> {
        self.fingerprint = Some(self.compute_fingerprint()?);
        Ok(self)
    }
}
