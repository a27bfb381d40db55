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

//! Batch lifecycle of a table topic writer.

use std::sync::Arc;

use tracing::{debug, error};

use crate::catalog::{PartitionSpecProvider, TableIdent};
use crate::evolution::{evolve, plan_spec_evolution};
use crate::fencing::FencingGuard;
use crate::spec::TableTopicConfig;
use crate::writer::file_writer::location_generator::{
    DefaultFileNameGenerator, DefaultLocationGenerator,
};
use crate::writer::file_writer::RollingFileWriterBuilder;
use crate::writer::partitioning::FanoutWriter;
use crate::writer::{FileSink, SpecPartitioner};
use crate::Result;

/// Writes the records of one topic partition into a table, one batch at a
/// time.
///
/// Each batch starts from a fresh view of the table. Whenever that view does
/// not match the configured declaration, because the declaration, the schema
/// or the spec itself changed (possibly by another writer), the spec is
/// evolved before any record is routed.
#[derive(Debug)]
pub struct TableTopicWriter {
    provider: Arc<dyn PartitionSpecProvider>,
    table_ident: TableIdent,
    config: TableTopicConfig,
    sink: Arc<dyn FileSink>,
    fencing: FencingGuard,
    file_name_generator: DefaultFileNameGenerator,
}

impl TableTopicWriter {
    /// Creates a writer for `table_ident`.
    ///
    /// File names are prefixed with the owned partition and epoch.
    pub fn new(
        provider: Arc<dyn PartitionSpecProvider>,
        table_ident: TableIdent,
        config: TableTopicConfig,
        sink: Arc<dyn FileSink>,
        fencing: FencingGuard,
    ) -> Self {
        let ownership = fencing.ownership();
        let file_name_generator =
            DefaultFileNameGenerator::new(format!("{}-{}", ownership.partition, ownership.epoch));
        Self {
            provider,
            table_ident,
            config,
            sink,
            fencing,
            file_name_generator,
        }
    }

    /// Creates a writer configured from the table's own properties.
    pub async fn from_table_properties(
        provider: Arc<dyn PartitionSpecProvider>,
        table_ident: TableIdent,
        sink: Arc<dyn FileSink>,
        fencing: FencingGuard,
    ) -> Result<Self> {
        let table = provider.load_table(&table_ident).await?;
        let config = TableTopicConfig::try_from(table.metadata().properties())?;
        Ok(Self::new(provider, table_ident, config, sink, fencing))
    }

    /// The table written to.
    pub fn table_ident(&self) -> &TableIdent {
        &self.table_ident
    }

    /// The active configuration.
    pub fn config(&self) -> &TableTopicConfig {
        &self.config
    }

    /// Replaces the configuration. Takes effect on the next batch.
    pub fn update_config(&mut self, config: TableTopicConfig) {
        self.config = config;
    }

    /// Starts a batch.
    ///
    /// Reloads the table, evolves its partition spec if needed and returns a
    /// writer bound to the resulting spec. The spec stays fixed for the
    /// whole batch.
    pub async fn start_batch(&mut self) -> Result<FanoutWriter> {
        let mut table = self.provider.load_table(&self.table_ident).await?;

        let outdated = plan_spec_evolution(&self.config.partition_by, table.metadata())
            .inspect_err(|e| {
                error!(table = %self.table_ident, error = %e, "invalid partition declaration");
            })?
            .is_some();
        if outdated {
            evolve(
                &self.config.partition_by,
                self.provider.as_ref(),
                &self.table_ident,
                self.config.commit_backoff(),
            )
            .await
            .inspect_err(|e| {
                error!(table = %self.table_ident, error = %e, "failed to evolve partition spec");
            })?;
            table = self.provider.load_table(&self.table_ident).await?;
        }

        let partitioner =
            SpecPartitioner::try_new(table.spec(), &table.schema(), &self.config.id_columns)?;
        let builder = RollingFileWriterBuilder::new(
            self.sink.clone(),
            DefaultLocationGenerator::new(table.metadata()),
            self.file_name_generator.clone(),
            self.fencing.clone(),
            self.config.target_file_size_bytes,
        );
        debug!(
            table = %self.table_ident,
            spec_id = table.spec().spec_id(),
            schema_id = table.metadata().current_schema_id(),
            "started batch"
        );
        Ok(FanoutWriter::new(Box::new(partitioner), builder))
    }
}
