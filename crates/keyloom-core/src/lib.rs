//! Core contracts and helpers for Keyloom.
//!
//! This crate defines the canonical compiled-descriptor types, the key-path
//! and TTL compilers, and the validation helpers shared by the migration
//! engine and the schema compiler.

pub mod error;
pub mod field;
pub mod keypath;
pub mod registry;
pub mod schema;
pub mod ttl;
pub mod types;
pub mod validation;

pub use error::{Error, Result};
pub use field::FieldModel;
pub use keypath::{KeyPathTemplate, PathToken, compile_key_paths};
pub use registry::TypeRegistry;
pub use schema::{ItemType, SchemaDescriptor};
pub use ttl::{TtlPolicy, resolve_ttl};
pub use types::{FieldType, InitialValue, MetadataSource, TtlSource};
pub use validation::{validate_descriptor, validate_item_type};

/// Current descriptor contract version for compiled schema artifacts.
pub const DESCRIPTOR_VERSION: &str = "0.1";
