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

//! This module contains memory catalog implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::lock::Mutex;
use tracing::info;

use super::{PartitionSpecProvider, TableCommit, TableCreation, TableIdent};
use crate::spec::{PartitionSpec, Schema, TableMetadataBuilder, TableMetadataRef};
use crate::table::Table;
use crate::{Error, ErrorKind, Result};

/// Memory catalog implementation.
///
/// Commits are checked and applied under a single lock, so concurrent
/// writers observe each other's spec changes as requirement conflicts.
#[derive(Debug)]
pub struct MemoryCatalog {
    tables: Mutex<HashMap<TableIdent, TableMetadataRef>>,
    warehouse_location: String,
}

impl MemoryCatalog {
    /// Creates a memory catalog whose tables default to locations under
    /// `warehouse_location`.
    pub fn new(warehouse_location: impl Into<String>) -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
            warehouse_location: warehouse_location.into(),
        }
    }

    /// Replaces the current schema of a table, as a schema change made
    /// outside the write path would.
    pub async fn replace_schema(&self, table_ident: &TableIdent, schema: Schema) -> Result<Table> {
        let mut tables = self.tables.lock().await;
        let metadata = tables.get(table_ident).ok_or_else(|| no_such_table(table_ident))?;
        let metadata = (**metadata)
            .clone()
            .into_builder()
            .set_current_schema(schema)
            .build()?;
        let metadata = TableMetadataRef::new(metadata);
        tables.insert(table_ident.clone(), metadata.clone());

        Ok(Table::builder()
            .identifier(table_ident.clone())
            .metadata(metadata)
            .build())
    }

    fn default_location(&self, table_ident: &TableIdent) -> String {
        let mut location = self.warehouse_location.trim_end_matches('/').to_string();
        for part in table_ident.namespace() {
            location.push('/');
            location.push_str(part);
        }
        location.push('/');
        location.push_str(table_ident.name());
        location
    }
}

fn no_such_table(table_ident: &TableIdent) -> Error {
    Error::new(
        ErrorKind::TableNotFound,
        format!("No such table: {table_ident}"),
    )
}

#[async_trait]
impl PartitionSpecProvider for MemoryCatalog {
    async fn load_table(&self, table_ident: &TableIdent) -> Result<Table> {
        let tables = self.tables.lock().await;
        let metadata = tables.get(table_ident).ok_or_else(|| no_such_table(table_ident))?;

        Ok(Table::builder()
            .identifier(table_ident.clone())
            .metadata(metadata.clone())
            .build())
    }

    async fn create_table(&self, creation: TableCreation) -> Result<Table> {
        let table_ident = TableIdent::new(vec![], creation.name.clone());
        self.create_table_in(table_ident, creation).await
    }

    async fn update_table(&self, commit: TableCommit) -> Result<Table> {
        let mut tables = self.tables.lock().await;
        let table_ident = commit.identifier().clone();
        let metadata = tables.get(&table_ident).ok_or_else(|| no_such_table(&table_ident))?;

        let current_table = Table::builder()
            .identifier(table_ident.clone())
            .metadata(metadata.clone())
            .build();

        // Apply TableCommit to get staged table
        let staged_table = commit.apply(current_table)?;
        tables.insert(table_ident, staged_table.metadata_ref());

        Ok(staged_table)
    }
}

impl MemoryCatalog {
    /// Create a table under an explicit identifier, namespace included.
    pub async fn create_table_in(
        &self,
        table_ident: TableIdent,
        creation: TableCreation,
    ) -> Result<Table> {
        let mut tables = self.tables.lock().await;
        if tables.contains_key(&table_ident) {
            return Err(Error::new(
                ErrorKind::TableAlreadyExists,
                format!("Cannot create table {table_ident}. Table already exists."),
            ));
        }

        let location = creation
            .location
            .unwrap_or_else(|| self.default_location(&table_ident));
        let metadata = TableMetadataBuilder::new(
            creation.schema,
            creation
                .partition_spec
                .unwrap_or_else(PartitionSpec::unpartitioned),
            location,
            creation.properties,
        )?
        .build()?;
        let metadata = TableMetadataRef::new(metadata);
        tables.insert(table_ident.clone(), metadata.clone());
        info!(table = %table_ident, uuid = %metadata.uuid(), "created table");

        Ok(Table::builder()
            .identifier(table_ident)
            .metadata(metadata)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::catalog::{TableRequirement, TableUpdate};
    use crate::spec::schema::tests::clickstream_schema;
    use crate::spec::{NestedField, PrimitiveType, Transform};

    async fn create_clicks(catalog: &MemoryCatalog) -> Table {
        catalog
            .create_table(
                TableCreation::builder()
                    .name("clicks")
                    .schema(clickstream_schema())
                    .build(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_load_table() {
        let catalog = MemoryCatalog::new("memory://warehouse/");
        let created = create_clicks(&catalog).await;
        assert_eq!("memory://warehouse/clicks", created.metadata().location());

        let loaded = catalog.load_table(created.identifier()).await.unwrap();
        assert_eq!(created.metadata(), loaded.metadata());

        let err = catalog
            .create_table(
                TableCreation::builder()
                    .name("clicks")
                    .schema(clickstream_schema())
                    .build(),
            )
            .await
            .unwrap_err();
        assert_eq!(ErrorKind::TableAlreadyExists, err.kind());

        let err = catalog
            .load_table(&TableIdent::from_strs(["missing"]).unwrap())
            .await
            .unwrap_err();
        assert_eq!(ErrorKind::TableNotFound, err.kind());
    }

    #[tokio::test]
    async fn test_update_table_checks_requirements() {
        let catalog = MemoryCatalog::new("memory://warehouse");
        let table = create_clicks(&catalog).await;
        let schema = table.schema();
        let spec = PartitionSpec::builder(&schema)
            .add_partition_field("region", Transform::Identity)
            .unwrap()
            .build();

        let commit = || {
            TableCommit::builder()
                .ident(table.identifier().clone())
                .requirements(vec![TableRequirement::DefaultSpecIdMatch { default_spec_id: 0 }])
                .updates(vec![
                    TableUpdate::AddSpec { spec: spec.clone() },
                    TableUpdate::SetDefaultSpec {
                        spec_id: TableMetadataBuilder::LAST_ADDED,
                    },
                ])
                .build()
        };

        let updated = catalog.update_table(commit()).await.unwrap();
        assert_eq!(1, updated.metadata().default_partition_spec_id());

        let err = catalog.update_table(commit()).await.unwrap_err();
        assert_eq!(ErrorKind::SpecCommitConflict, err.kind());
        assert!(err.retryable());
        let reloaded = catalog.load_table(table.identifier()).await.unwrap();
        assert_eq!(updated.metadata(), reloaded.metadata());
    }

    #[tokio::test]
    async fn test_replace_schema() {
        let catalog = MemoryCatalog::new("memory://warehouse");
        let table = create_clicks(&catalog).await;
        let schema = Schema::builder()
            .with_schema_id(2)
            .with_fields(vec![NestedField::required(1, "id", PrimitiveType::Long).into()])
            .build()
            .unwrap();

        let replaced = catalog
            .replace_schema(table.identifier(), schema)
            .await
            .unwrap();
        assert_eq!(2, replaced.metadata().current_schema_id());
        assert!(replaced.schema().field_by_name("page_url").is_none());
    }
}
