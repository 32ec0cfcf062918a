use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use keyloom_core::{FieldModel, SchemaDescriptor};

/// Field-level operation within a migration step.
///
/// Operations are tagged value records rather than closures, so persisted
/// schema history stays inspectable and replayable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FieldOp {
    /// Add a field with a complete, self-contained spec.
    AddField { field: FieldModel },
    /// Rename a field; key-path and TTL references follow automatically.
    RenameField { from: String, to: String },
    /// Relax requiredness, recording a read-time backfill for historical
    /// records that lack the field.
    MarkNotRequired {
        field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        backfill: Option<Value>,
    },
}

/// Ordered batch of field operations against one item type.
///
/// If any operation fails, the whole step fails atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TypeChange {
    pub item_type: String,
    pub ops: Vec<FieldOp>,
}

/// One versioned migration step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MigrationStep {
    /// Monotonically increasing, contiguous from 1.
    pub version: u64,
    pub description: String,
    pub changes: Vec<TypeChange>,
}

/// Immutable snapshot of the schema after applying all steps up to and
/// including `version`. Version 0 is the base compiled from declarations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SchemaVersion {
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub descriptor: SchemaDescriptor,
}

/// Full ordered chain of schema versions; the last entry is current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MigrationChain {
    pub versions: Vec<SchemaVersion>,
}

impl MigrationChain {
    /// The terminal "current" version with no further steps pending.
    pub fn current(&self) -> &SchemaVersion {
        self.versions
            .last()
            .expect("a migration chain always holds the base version")
    }

    pub fn version(&self, version: u64) -> Option<&SchemaVersion> {
        self.versions.iter().find(|entry| entry.version == version)
    }
}
