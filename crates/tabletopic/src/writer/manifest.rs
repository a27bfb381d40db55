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

use crate::spec::Struct;

/// A finished data file, ready to be committed by the snapshot coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub(crate) path: String,
    pub(crate) partition: Struct,
    pub(crate) spec_id: i32,
    pub(crate) record_count: u64,
    pub(crate) file_size_in_bytes: u64,
}

impl ManifestEntry {
    /// Full location of the file.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Partition tuple shared by every record in the file.
    pub fn partition(&self) -> &Struct {
        &self.partition
    }

    /// Id of the partition spec `partition` was computed with.
    pub fn spec_id(&self) -> i32 {
        self.spec_id
    }

    /// Number of records in the file.
    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    /// Size of the file.
    pub fn file_size_in_bytes(&self) -> u64 {
        self.file_size_in_bytes
    }
}

/// Every file finalized during one batch, in the order they were finalized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinishedFileManifest {
    entries: Vec<ManifestEntry>,
}

impl FinishedFileManifest {
    pub(crate) fn push(&mut self, entry: ManifestEntry) {
        self.entries.push(entry);
    }

    /// The finished files.
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the batch produced no file.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records across all files.
    pub fn total_record_count(&self) -> u64 {
        self.entries.iter().map(|e| e.record_count).sum()
    }

    /// Bytes across all files.
    pub fn total_file_size_in_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.file_size_in_bytes).sum()
    }

    /// Files written for `partition`, in finalize order.
    pub fn entries_for<'a>(
        &'a self,
        partition: &'a Struct,
    ) -> impl Iterator<Item = &'a ManifestEntry> + 'a {
        self.entries.iter().filter(move |e| &e.partition == partition)
    }
}

impl IntoIterator for FinishedFileManifest {
    type Item = ManifestEntry;
    type IntoIter = std::vec::IntoIter<ManifestEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
