use crate::error::{Error, Result};
use crate::schema::{ItemType, SchemaDescriptor};
use crate::validation::validate_item_type;
use crate::DESCRIPTOR_VERSION;

/// Holds item type definitions during compilation and freezes them into an
/// immutable descriptor.
///
/// Each compilation run constructs a fresh registry. `freeze` copies the
/// registered state out, so consumers holding a descriptor never observe
/// later mutation attempts — which are rejected anyway.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    item_types: Vec<ItemType>,
    frozen: bool,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item type, validating its internal invariants.
    pub fn register(&mut self, item_type: ItemType) -> Result<()> {
        if self.frozen {
            return Err(Error::RegistryFrozen {
                name: item_type.name,
            });
        }
        if self.item_types.iter().any(|existing| existing.name == item_type.name) {
            return Err(Error::DuplicateTypeName {
                name: item_type.name,
            });
        }
        validate_item_type(&item_type)?;
        self.item_types.push(item_type);
        Ok(())
    }

    /// Produce the immutable compiled descriptor and seal the registry.
    pub fn freeze(&mut self) -> SchemaDescriptor {
        self.frozen = true;
        SchemaDescriptor {
            descriptor_version: DESCRIPTOR_VERSION.to_string(),
            item_types: self.item_types.clone(),
            fingerprint: None,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn len(&self) -> usize {
        self.item_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.item_types.is_empty()
    }
}
