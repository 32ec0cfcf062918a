use thiserror::Error;

/// Errors emitted by the migration engine.
///
/// A legality error is fatal to its step only; the prior schema version is
/// never touched.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Steps must be applied in ascending, contiguous version order.
    #[error("out-of-order migration: expected version {expected}, found {found}")]
    OutOfOrderMigration { expected: u64, found: u64 },
    /// A change batch targets an item type absent from the prior version.
    #[error("migration targets unknown item type '{item_type}'")]
    UnknownItemType { item_type: String },
    /// The field to add (or rename to) is already present.
    #[error("field '{field}' already exists on item type '{item_type}'")]
    FieldAlreadyExists { item_type: String, field: String },
    /// The named field is absent from the prior version.
    #[error("unknown field '{field}' on item type '{item_type}'")]
    UnknownField { item_type: String, field: String },
    /// A required field cannot be added without a retroactively usable
    /// initial value, since historical records lack it.
    #[error(
        "cannot add required field '{field}' to item type '{item_type}' \
         without an initial value usable for existing records"
    )]
    UnsafeRequiredAdd { item_type: String, field: String },
    /// `mark_not_required` applied to a field that is already optional.
    #[error("field '{field}' on item type '{item_type}' is already optional")]
    AlreadyOptional { item_type: String, field: String },
    /// A step failed; carries the first sub-failure. No partial application:
    /// the step's operations are applied to a scratch snapshot that is
    /// discarded on failure.
    #[error("migration step {version} failed: {source}")]
    StepFailed {
        version: u64,
        #[source]
        source: Box<MigrationError>,
    },
    /// The post-step snapshot violated descriptor invariants.
    #[error(transparent)]
    Schema(#[from] keyloom_core::Error),
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrationError>;
