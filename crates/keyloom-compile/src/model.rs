use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Authored schema definition document.
///
/// This is the loosely structured input surface: field types, generators,
/// metadata sources, and TTL sources are plain tokens resolved during
/// compilation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SchemaDefinition {
    /// Named documentation aliases over primitive types (`UserID` → `uuid`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_aliases: Vec<TypeAliasDef>,
    /// Item type declarations in document order.
    pub item_types: Vec<ItemTypeDef>,
    /// Versioned migrations in ascending order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub migrations: Vec<MigrationDef>,
}

/// A named type alias declaration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TypeAliasDef {
    pub name: String,
    /// Primitive (or previously declared alias) the name delegates to.
    pub of: String,
}

/// One item type declaration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ItemTypeDef {
    pub name: String,
    /// One template or a list; the first entry is canonical.
    pub key_path: KeyPathDef,
    pub fields: Vec<FieldDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<TtlDef>,
}

/// Key path declaration; accepts a single template or a list.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum KeyPathDef {
    One(String),
    Many(Vec<String>),
}

impl KeyPathDef {
    /// Templates in declaration order.
    pub fn templates(&self) -> Vec<String> {
        match self {
            KeyPathDef::One(template) => vec![template.clone()],
            KeyPathDef::Many(templates) => templates.clone(),
        }
    }
}

/// One field declaration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FieldDef {
    pub name: String,
    /// Type tag: a primitive name or a declared alias.
    #[serde(rename = "type")]
    pub field_type: String,
    /// Defaults to required, matching the declaration surface.
    #[serde(default = "default_required")]
    pub required: bool,
    /// Initial-value generator token (`uuid`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<String>,
    /// Metadata derivation token (`createdAtTime`, `lastModifiedAtTime`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_metadata: Option<String>,
    /// Boolean predicate over the field value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid: Option<String>,
}

fn default_required() -> bool {
    true
}

/// TTL declaration: source event token plus duration field name.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TtlDef {
    /// Source event token (`fromCreation`, `fromLastModified`).
    pub source: String,
    pub field: String,
}

/// One versioned migration declaration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MigrationDef {
    pub version: u64,
    pub description: String,
    pub changes: Vec<TypeChangeDef>,
}

/// Ordered batch of field operations against one item type.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TypeChangeDef {
    pub item_type: String,
    pub ops: Vec<FieldOpDef>,
}

/// Field operation union for migration declarations.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FieldOpDef {
    /// Add a field with a complete inline spec.
    AddField { field: FieldDef },
    /// Rename a field.
    RenameField { from: String, to: String },
    /// Relax requiredness, recording a read-time backfill value.
    MarkNotRequired {
        field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        backfill: Option<Value>,
    },
}
