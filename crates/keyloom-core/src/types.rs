use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Semantic field types understood by the compiler.
///
/// `Alias` is a documentation layer over a primitive: it carries a display
/// name and delegates all validation and compilation to its target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldType {
    /// UTF-8 string.
    String,
    /// 128-bit UUID.
    Uuid,
    /// Boolean.
    Bool,
    /// 64-bit signed integer.
    Int,
    /// Millisecond-precision timestamp.
    TimestampMilliseconds,
    /// Second-precision duration.
    DurationSeconds,
    /// Named alias over an underlying primitive type.
    Alias { name: String, of: Box<FieldType> },
}

impl FieldType {
    /// Resolve aliases down to the underlying primitive type.
    pub fn primitive(&self) -> &FieldType {
        match self {
            FieldType::Alias { of, .. } => of.primitive(),
            other => other,
        }
    }

    /// Returns the type name for error messages; aliases report their
    /// display name.
    pub fn type_name(&self) -> &str {
        match self {
            FieldType::String => "string",
            FieldType::Uuid => "uuid",
            FieldType::Bool => "bool",
            FieldType::Int => "int",
            FieldType::TimestampMilliseconds => "timestamp_milliseconds",
            FieldType::DurationSeconds => "duration_seconds",
            FieldType::Alias { name, .. } => name,
        }
    }

    pub fn is_uuid(&self) -> bool {
        matches!(self.primitive(), FieldType::Uuid)
    }

    pub fn is_timestamp(&self) -> bool {
        matches!(self.primitive(), FieldType::TimestampMilliseconds)
    }

    pub fn is_duration(&self) -> bool {
        matches!(self.primitive(), FieldType::DurationSeconds)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Recognized initial-value generators for new records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum InitialValue {
    /// Generate a fresh UUID when the record is first written.
    Uuid,
}

/// Metadata events a field value can be derived from.
///
/// Serialized spellings match the authored tokens (`createdAtTime`,
/// `lastModifiedAtTime`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum MetadataSource {
    CreatedAtTime,
    LastModifiedAtTime,
}

impl MetadataSource {
    /// Intrinsic type of the derived value; both events carry timestamps.
    pub fn intrinsic_type(&self) -> FieldType {
        FieldType::TimestampMilliseconds
    }
}

impl FromStr for MetadataSource {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "createdAtTime" => Ok(MetadataSource::CreatedAtTime),
            "lastModifiedAtTime" => Ok(MetadataSource::LastModifiedAtTime),
            _ => Err(()),
        }
    }
}

/// Source events a TTL policy can anchor expiration to.
///
/// Expiration = source event timestamp + duration field value. The runtime
/// layer recomputes it whenever the source timestamp changes; for
/// `fromLastModified` every update to a record refreshes the TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum TtlSource {
    FromCreation,
    FromLastModified,
}

impl FromStr for TtlSource {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "fromCreation" => Ok(TtlSource::FromCreation),
            "fromLastModified" => Ok(TtlSource::FromLastModified),
            _ => Err(()),
        }
    }
}
