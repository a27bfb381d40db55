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

//! Table model of a table topic: types, schema, values, transforms and
//! partition specs.

mod datatypes;
mod partition;
pub(crate) mod schema;
mod table_metadata;
mod table_properties;
mod transform;
mod values;

pub use datatypes::{NestedField, NestedFieldRef, PrimitiveType};
pub use partition::{
    PartitionField, PartitionSpec, PartitionSpecBuilder, PartitionSpecRef,
    UNPARTITIONED_LAST_ASSIGNED_ID, UNPARTITIONED_SPEC_ID,
};
pub use schema::{Schema, SchemaBuilder, SchemaId, SchemaRef, DEFAULT_SCHEMA_ID};
pub use table_metadata::{TableMetadata, TableMetadataBuilder, TableMetadataRef};
pub use table_properties::TableTopicConfig;
pub use transform::{Transform, TransformDescriptor};
pub(crate) use values::date_from_days;
pub use values::{Literal, Struct};
