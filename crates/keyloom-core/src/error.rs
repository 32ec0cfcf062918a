use thiserror::Error;

/// Core error type shared across Keyloom crates.
///
/// Every variant carries the item type and field names needed to locate the
/// offending declaration; nothing is retried or silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A field declaration is internally inconsistent.
    #[error("invalid field '{field}' on item type '{item_type}': {reason}")]
    InvalidFieldDefinition {
        item_type: String,
        field: String,
        reason: String,
    },
    /// A key path template could not be tokenized.
    #[error("malformed key path '{template}' on item type '{item_type}': {reason}")]
    MalformedKeyPath {
        item_type: String,
        template: String,
        reason: String,
    },
    /// A key path placeholder has no matching field declaration.
    #[error("key path '{template}' on item type '{item_type}' references unknown field '{field}'")]
    UnknownKeyPathField {
        item_type: String,
        template: String,
        field: String,
    },
    /// The same field is bound more than once within a single template.
    #[error("key path '{template}' on item type '{item_type}' binds field '{field}' more than once")]
    DuplicateKeyPathField {
        item_type: String,
        template: String,
        field: String,
    },
    /// A TTL policy references a field that does not exist.
    #[error("ttl policy on item type '{item_type}' references unknown field '{field}'")]
    UnknownTtlField { item_type: String, field: String },
    /// A TTL policy references a field that is not duration-typed.
    #[error("ttl field '{field}' on item type '{item_type}' must be duration-typed, found {found}")]
    InvalidTtlFieldType {
        item_type: String,
        field: String,
        found: String,
    },
    /// A TTL policy names an unrecognized source event.
    #[error("unrecognized ttl source '{source_event}' on item type '{item_type}'")]
    InvalidTtlSource { item_type: String, source_event: String },
    /// An item type with the same name is already registered.
    #[error("duplicate item type name: {name}")]
    DuplicateTypeName { name: String },
    /// Registration was attempted after the registry was frozen.
    #[error("registry is frozen; cannot register item type '{name}'")]
    RegistryFrozen { name: String },
    /// The schema violates internal invariants.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
}

/// Convenience alias for results returned by Keyloom crates.
pub type Result<T> = std::result::Result<T, Error>;
