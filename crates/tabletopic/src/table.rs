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

//! Table API of a table topic.

use std::sync::Arc;

use typed_builder::TypedBuilder;

use crate::catalog::TableIdent;
use crate::spec::{PartitionSpecRef, SchemaRef, TableMetadata, TableMetadataRef};

/// A table as loaded from a
/// [`PartitionSpecProvider`](crate::catalog::PartitionSpecProvider).
///
/// The metadata is an immutable snapshot; a later load or commit returns a
/// new `Table`.
#[derive(Debug, Clone, TypedBuilder)]
pub struct Table {
    #[builder(setter(into))]
    metadata: TableMetadataRef,
    identifier: TableIdent,
}

impl Table {
    /// Name of the table in its provider.
    pub fn identifier(&self) -> &TableIdent {
        &self.identifier
    }

    /// The metadata snapshot.
    pub fn metadata(&self) -> &TableMetadata {
        &self.metadata
    }

    /// Shared handle to the metadata snapshot.
    pub fn metadata_ref(&self) -> TableMetadataRef {
        self.metadata.clone()
    }

    /// The current schema.
    pub fn schema(&self) -> SchemaRef {
        self.metadata.current_schema().clone()
    }

    /// The default partition spec, used for every new data file.
    pub fn spec(&self) -> PartitionSpecRef {
        self.metadata.default_partition_spec().clone()
    }

    pub(crate) fn with_metadata(mut self, metadata: TableMetadata) -> Self {
        self.metadata = Arc::new(metadata);
        self
    }
}
