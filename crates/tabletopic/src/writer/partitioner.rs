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

use itertools::Itertools;
use tracing::warn;

use super::{Record, RecordPartitioner};
use crate::spec::{PartitionSpecRef, Schema, Struct};
use crate::transform::{create_transform_function, BoxedTransformFunction};
use crate::{Error, ErrorKind, Result};

/// Partitions records by applying the transforms of a partition spec.
///
/// The spec is bound to the schema once on construction. Every record must
/// carry a value for each declared id column.
pub struct SpecPartitioner {
    spec: PartitionSpecRef,
    functions: Vec<(i32, BoxedTransformFunction)>,
    id_columns: Vec<(String, i32)>,
}

impl SpecPartitioner {
    /// Binds `spec` to `schema`.
    ///
    /// Fails if a spec field can't be applied to its source column, or if an
    /// id column is not in the schema.
    pub fn try_new(spec: PartitionSpecRef, schema: &Schema, id_columns: &[String]) -> Result<Self> {
        spec.partition_type(schema)?;

        let id_columns = id_columns
            .iter()
            .map(|name| {
                schema
                    .field_id_by_name(name)
                    .map(|id| (name.clone(), id))
                    .ok_or_else(|| {
                        Error::new(
                            ErrorKind::UnknownSourceField,
                            format!("Id column {name} is not in the table schema"),
                        )
                    })
            })
            .try_collect::<_, Vec<_>, _>()?;

        if !id_columns.is_empty() {
            for field in spec.fields() {
                if !id_columns.iter().any(|(_, id)| *id == field.source_id) {
                    warn!(
                        partition_field = %field.name,
                        source_id = field.source_id,
                        "partition source column is not an id column, updates may move rows between partitions"
                    );
                }
            }
        }

        let functions = spec
            .fields()
            .iter()
            .map(|field| Ok((field.source_id, create_transform_function(&field.transform)?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            spec,
            functions,
            id_columns,
        })
    }
}

impl RecordPartitioner for SpecPartitioner {
    fn spec(&self) -> &PartitionSpecRef {
        &self.spec
    }

    fn partition(&self, record: &Record) -> Result<Struct> {
        if let Some((name, _)) = self
            .id_columns
            .iter()
            .find(|(_, id)| record.get(*id).is_none())
        {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                format!("Record has no value for id column {name}"),
            ));
        }

        self.functions
            .iter()
            .map(|(source_id, function)| match record.get(*source_id) {
                Some(value) => function.transform_literal(value),
                None => Ok(None),
            })
            .collect()
    }
}
