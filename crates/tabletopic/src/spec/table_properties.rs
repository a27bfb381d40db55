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

use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use backon::ExponentialBuilder;

use super::TransformDescriptor;
use crate::error::{Error, ErrorKind, Result};
use crate::partition_by::parse_partition_by_descriptors;

// Absent keys fall back to `default`.
fn parse_property<T: FromStr>(
    properties: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T>
where
    <T as FromStr>::Err: Display,
{
    properties.get(key).map_or(Ok(default), |value| {
        value.trim().parse::<T>().map_err(|e| {
            Error::new(
                ErrorKind::DataInvalid,
                format!("property {key} is malformed: {e}"),
            )
        })
    })
}

/// Configuration of a table topic, read from the topic's properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableTopicConfig {
    /// Partition-by declaration, parsed.
    pub partition_by: Vec<TransformDescriptor>,
    /// Declared primary-key columns.
    pub id_columns: Vec<String>,
    /// Byte threshold at which an open data file is rolled over.
    pub target_file_size_bytes: u64,
    /// Retries of a conflicting spec commit after the first attempt.
    pub commit_num_retries: usize,
    /// First backoff delay.
    pub commit_min_retry_wait_ms: u64,
    /// Cap on a single backoff delay.
    pub commit_max_retry_wait_ms: u64,
    /// Cap on the summed backoff delays.
    pub commit_total_retry_timeout_ms: u64,
}

impl TableTopicConfig {
    /// Property key for the partition-by declaration.
    pub const PROPERTY_PARTITION_BY: &str = "partition.by";
    /// Default partition-by declaration: unpartitioned.
    pub const PROPERTY_PARTITION_BY_DEFAULT: &str = "";

    /// Property key for the comma separated primary-key columns.
    pub const PROPERTY_ID_COLUMNS: &str = "id.columns";

    /// Property key for the rollover threshold in bytes.
    pub const PROPERTY_TARGET_FILE_SIZE: &str = "target.file.size";
    /// Default rollover threshold.
    pub const PROPERTY_TARGET_FILE_SIZE_DEFAULT: u64 = 512 * 1024 * 1024; // 512 MB

    /// Spec commit retries.
    pub const PROPERTY_COMMIT_NUM_RETRIES: &str = "commit.retry.num-retries";
    /// Default for [`Self::PROPERTY_COMMIT_NUM_RETRIES`].
    pub const PROPERTY_COMMIT_NUM_RETRIES_DEFAULT: usize = 4;

    /// First spec commit backoff delay, in ms.
    pub const PROPERTY_COMMIT_MIN_RETRY_WAIT_MS: &str = "commit.retry.min-wait-ms";
    /// Default for [`Self::PROPERTY_COMMIT_MIN_RETRY_WAIT_MS`].
    pub const PROPERTY_COMMIT_MIN_RETRY_WAIT_MS_DEFAULT: u64 = 100;

    /// Longest single spec commit backoff delay, in ms.
    pub const PROPERTY_COMMIT_MAX_RETRY_WAIT_MS: &str = "commit.retry.max-wait-ms";
    /// Default for [`Self::PROPERTY_COMMIT_MAX_RETRY_WAIT_MS`].
    pub const PROPERTY_COMMIT_MAX_RETRY_WAIT_MS_DEFAULT: u64 = 60_000;

    /// Longest total time spent backing off spec commits, in ms.
    pub const PROPERTY_COMMIT_TOTAL_RETRY_TIME_MS: &str = "commit.retry.total-timeout-ms";
    /// Default for [`Self::PROPERTY_COMMIT_TOTAL_RETRY_TIME_MS`].
    pub const PROPERTY_COMMIT_TOTAL_RETRY_TIME_MS_DEFAULT: u64 = 1_800_000;

    /// Backoff policy for spec commits.
    pub fn commit_backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::new()
            .with_min_delay(Duration::from_millis(self.commit_min_retry_wait_ms))
            .with_max_delay(Duration::from_millis(self.commit_max_retry_wait_ms))
            .with_total_delay(Some(Duration::from_millis(
                self.commit_total_retry_timeout_ms,
            )))
            .with_max_times(self.commit_num_retries)
            .with_factor(2.0)
    }
}

impl Default for TableTopicConfig {
    fn default() -> Self {
        Self {
            partition_by: vec![],
            id_columns: vec![],
            target_file_size_bytes: Self::PROPERTY_TARGET_FILE_SIZE_DEFAULT,
            commit_num_retries: Self::PROPERTY_COMMIT_NUM_RETRIES_DEFAULT,
            commit_min_retry_wait_ms: Self::PROPERTY_COMMIT_MIN_RETRY_WAIT_MS_DEFAULT,
            commit_max_retry_wait_ms: Self::PROPERTY_COMMIT_MAX_RETRY_WAIT_MS_DEFAULT,
            commit_total_retry_timeout_ms: Self::PROPERTY_COMMIT_TOTAL_RETRY_TIME_MS_DEFAULT,
        }
    }
}

impl TryFrom<&HashMap<String, String>> for TableTopicConfig {
    type Error = Error;

    fn try_from(props: &HashMap<String, String>) -> Result<Self> {
        let partition_by = parse_partition_by_descriptors(
            props
                .get(TableTopicConfig::PROPERTY_PARTITION_BY)
                .map(String::as_str)
                .unwrap_or(TableTopicConfig::PROPERTY_PARTITION_BY_DEFAULT),
        )?;
        let id_columns = props
            .get(TableTopicConfig::PROPERTY_ID_COLUMNS)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let target_file_size_bytes = parse_property(
            props,
            TableTopicConfig::PROPERTY_TARGET_FILE_SIZE,
            TableTopicConfig::PROPERTY_TARGET_FILE_SIZE_DEFAULT,
        )?;
        if target_file_size_bytes == 0 {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                format!(
                    "property {} must be positive",
                    TableTopicConfig::PROPERTY_TARGET_FILE_SIZE
                ),
            ));
        }

        Ok(TableTopicConfig {
            partition_by,
            id_columns,
            target_file_size_bytes,
            commit_num_retries: parse_property(
                props,
                TableTopicConfig::PROPERTY_COMMIT_NUM_RETRIES,
                TableTopicConfig::PROPERTY_COMMIT_NUM_RETRIES_DEFAULT,
            )?,
            commit_min_retry_wait_ms: parse_property(
                props,
                TableTopicConfig::PROPERTY_COMMIT_MIN_RETRY_WAIT_MS,
                TableTopicConfig::PROPERTY_COMMIT_MIN_RETRY_WAIT_MS_DEFAULT,
            )?,
            commit_max_retry_wait_ms: parse_property(
                props,
                TableTopicConfig::PROPERTY_COMMIT_MAX_RETRY_WAIT_MS,
                TableTopicConfig::PROPERTY_COMMIT_MAX_RETRY_WAIT_MS_DEFAULT,
            )?,
            commit_total_retry_timeout_ms: parse_property(
                props,
                TableTopicConfig::PROPERTY_COMMIT_TOTAL_RETRY_TIME_MS,
                TableTopicConfig::PROPERTY_COMMIT_TOTAL_RETRY_TIME_MS_DEFAULT,
            )?,
        })
    }
}
