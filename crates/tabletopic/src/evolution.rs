// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Partition spec evolution.
//!
//! Keeps a table's default partition spec in line with the declared
//! partition-by descriptors. Fields that already match a declaration are
//! kept with their ids; a column whose transform changed has its field
//! replaced; fields nobody declares anymore, or whose column is gone from
//! the schema, are removed.

use std::collections::HashSet;

use backon::ExponentialBuilder;
use tracing::{debug, info, warn};

use crate::catalog::{PartitionSpecProvider, TableIdent};
use crate::spec::{PartitionSpec, TableMetadata, TransformDescriptor};
use crate::transaction::{ApplyTransactionAction, Transaction};
use crate::Result;

/// Computes the spec the table should move to, or `None` if the table's
/// default spec already matches `desired`.
///
/// Descriptors whose column is not in the current schema are skipped. A
/// descriptor repeated verbatim counts once.
pub fn plan_spec_evolution(
    desired: &[TransformDescriptor],
    metadata: &TableMetadata,
) -> Result<Option<PartitionSpec>> {
    let spec = metadata.default_partition_spec();
    if desired.is_empty() && spec.is_unpartitioned() {
        return Ok(None);
    }

    let schema = metadata.current_schema();
    let mut seen = HashSet::new();
    let mut resolved = Vec::with_capacity(desired.len());
    for descriptor in desired {
        let Some(source_id) = schema.field_id_by_name(descriptor.source_name()) else {
            warn!(
                descriptor = %descriptor,
                schema_id = schema.schema_id(),
                "partition source column not in table schema, skipping"
            );
            continue;
        };
        if !seen.insert((source_id, descriptor.transform())) {
            debug!(descriptor = %descriptor, "ignoring repeated partition declaration");
            continue;
        }
        resolved.push((source_id, descriptor));
    }

    let existing = spec.fields();
    let mut claimed = vec![false; existing.len()];
    let mut matched = vec![false; resolved.len()];

    // Fields already declared with an equivalent transform stay untouched.
    for (idx, (source_id, descriptor)) in resolved.iter().enumerate() {
        let position = existing.iter().enumerate().position(|(pos, field)| {
            !claimed[pos]
                && field.source_id == *source_id
                && field.transform == descriptor.transform()
        });
        if let Some(pos) = position {
            claimed[pos] = true;
            matched[idx] = true;
        }
    }

    // The rest replace a field on the same column, or are new.
    let mut changes = 0usize;
    let mut replaced = vec![false; existing.len()];
    let mut additions = vec![];
    for (idx, (source_id, descriptor)) in resolved.iter().enumerate() {
        if matched[idx] {
            continue;
        }
        let position = existing
            .iter()
            .enumerate()
            .position(|(pos, field)| !claimed[pos] && field.source_id == *source_id);
        if let Some(pos) = position {
            claimed[pos] = true;
            replaced[pos] = true;
            debug!(
                field = %existing[pos].name,
                descriptor = %descriptor,
                "replacing partition field"
            );
        }
        additions.push(*descriptor);
        changes += 1;
    }

    for (pos, field) in existing.iter().enumerate() {
        if !claimed[pos] {
            debug!(field = %field.name, "removing partition field");
            changes += 1;
        }
    }

    if changes == 0 {
        return Ok(None);
    }

    let mut builder =
        PartitionSpec::builder(schema).with_last_assigned_field_id(metadata.last_partition_id());
    for (pos, field) in existing.iter().enumerate() {
        if claimed[pos] && !replaced[pos] {
            builder = builder.add_existing_field(field.clone())?;
        }
    }
    for descriptor in additions {
        let mut name = descriptor
            .transform()
            .partition_field_name(descriptor.source_name());
        if builder.contains_name(&name) {
            name = format!("{name}_{}", builder.last_assigned_field_id() + 1);
        }
        builder =
            builder.add_named_partition_field(descriptor.source_name(), name, descriptor.transform())?;
    }

    Ok(Some(builder.build()))
}

/// Evolves the default partition spec of a table to match `desired`.
///
/// The change is committed as a single spec update. On a commit conflict
/// the table is reloaded and the diff recomputed, with retries bounded by
/// `backoff`. Returns whether the table's default spec differs from the
/// one it had when this call started.
pub async fn evolve(
    desired: &[TransformDescriptor],
    provider: &dyn PartitionSpecProvider,
    table_ident: &TableIdent,
    backoff: ExponentialBuilder,
) -> Result<bool> {
    let table = provider.load_table(table_ident).await?;
    let before = table.spec();

    let tx = Transaction::new(&table);
    let tx = tx
        .update_partition_spec()
        .set_descriptors(desired.to_vec())
        .apply(tx)?;
    let committed = tx.commit(provider, backoff).await?;

    let after = committed.spec();
    let changed = after.spec_id() != before.spec_id();
    if changed {
        info!(
            table = %table_ident,
            from_spec_id = before.spec_id(),
            to_spec_id = after.spec_id(),
            fields = after.fields().len(),
            "evolved partition spec"
        );
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::spec::schema::tests::clickstream_schema;
    use crate::spec::{PartitionField, Schema, TableMetadataBuilder, Transform};

    fn metadata_with(declaration: &[TransformDescriptor]) -> TableMetadata {
        let schema = clickstream_schema();
        let spec = crate::partition_by::build_partition_spec(declaration, &schema).unwrap();
        TableMetadataBuilder::new(schema, spec, "memory://warehouse/clicks", HashMap::new())
            .unwrap()
            .build()
            .unwrap()
    }

    fn fields(spec: &PartitionSpec) -> Vec<(i32, i32, Transform)> {
        spec.fields()
            .iter()
            .map(|f| (f.source_id, f.field_id, f.transform))
            .collect()
    }

    #[test]
    fn test_empty_on_unpartitioned_is_noop() {
        let metadata = metadata_with(&[]);
        assert_eq!(None, plan_spec_evolution(&[], &metadata).unwrap());
    }

    #[test]
    fn test_equivalent_declaration_is_noop() {
        let declaration = vec![
            TransformDescriptor::new("page_url", Transform::Bucket(5)),
            TransformDescriptor::new("timestamp", Transform::Hour),
        ];
        let metadata = metadata_with(&declaration);

        assert_eq!(None, plan_spec_evolution(&declaration, &metadata).unwrap());
        // Declared order doesn't matter.
        let reordered = vec![declaration[1].clone(), declaration[0].clone()];
        assert_eq!(None, plan_spec_evolution(&reordered, &metadata).unwrap());
    }

    #[test]
    fn test_replace_identity_with_bucket() {
        let metadata = metadata_with(&[TransformDescriptor::identity("page_url")]);
        let spec = plan_spec_evolution(
            &[TransformDescriptor::new("page_url", Transform::Bucket(5))],
            &metadata,
        )
        .unwrap()
        .unwrap();

        assert_eq!(vec![(2, 1001, Transform::Bucket(5))], fields(&spec));
        assert_eq!("page_url_bucket", spec.fields()[0].name);
    }

    #[test]
    fn test_bucket_width_change_is_one_replace() {
        let metadata =
            metadata_with(&[TransformDescriptor::new("page_url", Transform::Bucket(4))]);
        let spec = plan_spec_evolution(
            &[TransformDescriptor::new("page_url", Transform::Bucket(8))],
            &metadata,
        )
        .unwrap()
        .unwrap();

        assert_eq!(vec![(2, 1001, Transform::Bucket(8))], fields(&spec));
    }

    #[test]
    fn test_kept_fields_keep_ids_and_new_fields_append() {
        let metadata = metadata_with(&[
            TransformDescriptor::identity("region"),
            TransformDescriptor::new("timestamp", Transform::Day),
        ]);
        let spec = plan_spec_evolution(
            &[
                TransformDescriptor::new("page_url", Transform::Truncate(8)),
                TransformDescriptor::identity("region"),
            ],
            &metadata,
        )
        .unwrap()
        .unwrap();

        assert_eq!(
            vec![
                (4, 1000, Transform::Identity),
                (2, 1002, Transform::Truncate(8)),
            ],
            fields(&spec)
        );
    }

    #[test]
    fn test_unresolved_descriptor_is_skipped() {
        let metadata = metadata_with(&[TransformDescriptor::identity("region")]);
        let desired = vec![
            TransformDescriptor::identity("region"),
            TransformDescriptor::new("not_yet_there", Transform::Bucket(2)),
        ];
        assert_eq!(None, plan_spec_evolution(&desired, &metadata).unwrap());
    }

    #[test]
    fn test_width_outside_i32_fails_before_commit() {
        let metadata = metadata_with(&[TransformDescriptor::identity("region")]);
        let desired = vec![TransformDescriptor::new(
            "page_url",
            Transform::Bucket(3_000_000_000),
        )];
        let err = plan_spec_evolution(&desired, &metadata).unwrap_err();
        assert_eq!(crate::ErrorKind::MalformedTransformArgs, err.kind());
    }

    #[test]
    fn test_dropped_column_removes_field() {
        let metadata = metadata_with(&[
            TransformDescriptor::identity("region"),
            TransformDescriptor::new("page_url", Transform::Bucket(5)),
        ]);
        let schema = clickstream_schema();
        let without_region = Schema::builder()
            .with_schema_id(2)
            .with_fields(
                schema
                    .fields()
                    .iter()
                    .filter(|f| f.name != "region")
                    .cloned()
                    .collect::<Vec<_>>(),
            )
            .with_identifier_field_ids([1])
            .build()
            .unwrap();
        let metadata = metadata
            .into_builder()
            .set_current_schema(without_region)
            .build()
            .unwrap();

        let spec = plan_spec_evolution(
            &[
                TransformDescriptor::identity("region"),
                TransformDescriptor::new("page_url", Transform::Bucket(5)),
            ],
            &metadata,
        )
        .unwrap()
        .unwrap();
        assert_eq!(vec![(2, 1001, Transform::Bucket(5))], fields(&spec));
    }

    #[test]
    fn test_undeclared_fields_removed() {
        let metadata = metadata_with(&[TransformDescriptor::identity("region")]);
        let spec = plan_spec_evolution(&[], &metadata).unwrap().unwrap();
        assert!(spec.is_unpartitioned());
    }

    #[test]
    fn test_repeated_declaration_counts_once() {
        let metadata = metadata_with(&[]);
        let spec = plan_spec_evolution(
            &[
                TransformDescriptor::identity("region"),
                TransformDescriptor::identity("region"),
            ],
            &metadata,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            vec![PartitionField::builder()
                .source_id(4)
                .field_id(1000)
                .name("region")
                .transform(Transform::Identity)
                .build()],
            spec.fields()
        );
    }

    #[test]
    fn test_second_field_on_same_column() {
        let metadata =
            metadata_with(&[TransformDescriptor::new("page_url", Transform::Bucket(4))]);
        let spec = plan_spec_evolution(
            &[
                TransformDescriptor::new("page_url", Transform::Bucket(4)),
                TransformDescriptor::new("page_url", Transform::Bucket(16)),
            ],
            &metadata,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            vec![
                (2, 1000, Transform::Bucket(4)),
                (2, 1001, Transform::Bucket(16)),
            ],
            fields(&spec)
        );
        assert_eq!("page_url_bucket_1001", spec.fields()[1].name);
    }
}
