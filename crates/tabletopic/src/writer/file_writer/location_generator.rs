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

//! This module contains the location generator and file name generator for
//! data files.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use crate::spec::TableMetadata;

/// `LocationGenerator` used to generate the location of data file.
pub trait LocationGenerator: Clone + Send + Sync + 'static {
    /// Generate an absolute path for `file_name` under `partition_path`.
    /// e.g. For partition path "region=eu" and file name "part-00000.jsonl",
    /// the generated location may be "/table/data/region=eu/part-00000.jsonl".
    fn generate_location(&self, partition_path: &str, file_name: &str) -> String;
}

const DEFAULT_DATA_DIR: &str = "data";

/// `DefaultLocationGenerator` places data files under `<table location>/data`.
#[derive(Clone, Debug)]
pub struct DefaultLocationGenerator {
    dir_path: String,
}

impl DefaultLocationGenerator {
    /// Create a new `DefaultLocationGenerator`.
    pub fn new(table_metadata: &TableMetadata) -> Self {
        Self::with_data_location(format!(
            "{}/{DEFAULT_DATA_DIR}",
            table_metadata.location().trim_end_matches('/')
        ))
    }

    /// Create a generator writing directly under `data_location`.
    pub fn with_data_location(data_location: impl Into<String>) -> Self {
        Self {
            dir_path: data_location.into(),
        }
    }
}

impl LocationGenerator for DefaultLocationGenerator {
    fn generate_location(&self, partition_path: &str, file_name: &str) -> String {
        if partition_path.is_empty() {
            format!("{}/{}", self.dir_path, file_name)
        } else {
            format!("{}/{}/{}", self.dir_path, partition_path, file_name)
        }
    }
}

/// `FileNameGenerator` used to generate file names for data files.
pub trait FileNameGenerator: Clone + Send + Sync + 'static {
    /// Generate a file name.
    fn generate_file_name(&self) -> String;
}

/// `DefaultFileNameGenerator` generates names `<prefix>-<seq>-<uuid>.jsonl`.
///
/// The sequence is shared by clones and the uuid is fixed per generator, so
/// every file opened by one writer run gets a distinct name.
#[derive(Clone, Debug)]
pub struct DefaultFileNameGenerator {
    prefix: String,
    run_id: Uuid,
    file_count: Arc<AtomicU64>,
}

impl DefaultFileNameGenerator {
    /// Create a new `FileNameGenerator`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            run_id: Uuid::new_v4(),
            file_count: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl FileNameGenerator for DefaultFileNameGenerator {
    fn generate_file_name(&self) -> String {
        let file_id = self.file_count.fetch_add(1, Ordering::Relaxed);
        format!("{}-{:05}-{}.jsonl", self.prefix, file_id, self.run_id)
    }
}
