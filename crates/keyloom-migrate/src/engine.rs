use tracing::{debug, info};

use keyloom_core::{validate_descriptor, ItemType, SchemaDescriptor};

use crate::errors::{MigrationError, Result};
use crate::model::{FieldOp, MigrationChain, MigrationStep, SchemaVersion, TypeChange};

/// Applies versioned migration steps to a base descriptor, producing the
/// full chain of schema-version snapshots.
#[derive(Debug, Default)]
pub struct MigrationEngine;

impl MigrationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Apply `steps` to `base` in order.
    ///
    /// The base descriptor becomes version 0. Each step is applied to a
    /// scratch copy of the prior snapshot and re-validated as a standalone
    /// descriptor before it is admitted to the chain; a failing step
    /// discards the scratch copy and surfaces `StepFailed` with the first
    /// sub-failure.
    pub fn apply(&self, base: &SchemaDescriptor, steps: &[MigrationStep]) -> Result<MigrationChain> {
        validate_descriptor(base)?;

        let mut versions = vec![SchemaVersion {
            version: 0,
            description: None,
            descriptor: base.clone(),
        }];

        for step in steps {
            let prior = versions.last().expect("chain holds the base version");
            let expected = prior.version + 1;
            if step.version != expected {
                return Err(MigrationError::OutOfOrderMigration {
                    expected,
                    found: step.version,
                });
            }

            let descriptor = self
                .apply_step(&prior.descriptor, step)
                .map_err(|err| MigrationError::StepFailed {
                    version: step.version,
                    source: Box::new(err),
                })?;

            info!(
                version = step.version,
                description = %step.description,
                "migration step applied"
            );

            versions.push(SchemaVersion {
                version: step.version,
                description: Some(step.description.clone()),
                descriptor,
            });
        }

        Ok(MigrationChain { versions })
    }

    fn apply_step(&self, prior: &SchemaDescriptor, step: &MigrationStep) -> Result<SchemaDescriptor> {
        let mut next = prior.clone();

        for change in &step.changes {
            let item = next
                .item_type_mut(&change.item_type)
                .ok_or_else(|| MigrationError::UnknownItemType {
                    item_type: change.item_type.clone(),
                })?;
            apply_change(item, change)?;
        }

        validate_descriptor(&next)?;
        Ok(next)
    }
}

fn apply_change(item: &mut ItemType, change: &TypeChange) -> Result<()> {
    for op in &change.ops {
        match op {
            FieldOp::AddField { field } => {
                debug!(item_type = %item.name, field = %field.name, "add field");
                if item.has_field(&field.name) {
                    return Err(MigrationError::FieldAlreadyExists {
                        item_type: item.name.clone(),
                        field: field.name.clone(),
                    });
                }
                // Historical records lack the field, so a required add must
                // carry a generator usable for them.
                if field.required && field.initial_value.is_none() {
                    return Err(MigrationError::UnsafeRequiredAdd {
                        item_type: item.name.clone(),
                        field: field.name.clone(),
                    });
                }
                field.validate(&item.name)?;
                item.fields.push(field.clone());
            }
            FieldOp::RenameField { from, to } => {
                debug!(item_type = %item.name, from = %from, to = %to, "rename field");
                if !item.has_field(from) {
                    return Err(MigrationError::UnknownField {
                        item_type: item.name.clone(),
                        field: from.clone(),
                    });
                }
                if item.has_field(to) {
                    return Err(MigrationError::FieldAlreadyExists {
                        item_type: item.name.clone(),
                        field: to.clone(),
                    });
                }
                item.rename_field(from, to);
            }
            FieldOp::MarkNotRequired { field, backfill } => {
                debug!(item_type = %item.name, field = %field, "mark field not required");
                let item_name = item.name.clone();
                let target = item.field_mut(field).ok_or_else(|| MigrationError::UnknownField {
                    item_type: item_name,
                    field: field.clone(),
                })?;
                if !target.required {
                    return Err(MigrationError::AlreadyOptional {
                        item_type: item.name.clone(),
                        field: field.clone(),
                    });
                }
                target.required = false;
                target.backfill = backfill.clone();
            }
        }
    }

    Ok(())
}
