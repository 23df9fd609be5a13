// Copyright 2025 Anapaya Systems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! MAC pool configuration.

use serde::{Deserialize, Serialize};

use crate::mac::{MacRange, RangeParseError};

/// Configuration of a MAC pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacPoolConfig {
    /// Comma separated list of `<mac>-<mac>` ranges.
    pub ranges: String,
    /// Whether an address may be in use by more than one interface.
    #[serde(default)]
    pub allow_duplicates: bool,
}

impl MacPoolConfig {
    /// Creates a new configuration.
    pub fn new(ranges: impl Into<String>, allow_duplicates: bool) -> Self {
        Self {
            ranges: ranges.into(),
            allow_duplicates,
        }
    }

    /// Parses the configured ranges.
    pub fn parse_ranges(&self) -> Result<Vec<MacRange>, RangeParseError> {
        parse_ranges(&self.ranges)
    }
}

/// Parses a comma separated list of `<mac>-<mac>` ranges.
///
/// Whitespace around entries and empty entries are ignored.
///
/// # Examples
///
/// ```
/// # use mac_pool::config::parse_ranges;
/// let ranges = parse_ranges("00:1a:4a:16:01:51-00:1a:4a:16:01:e6, 02:00:00:00:00:00-02:00:00:00:00:ff")
///     .unwrap();
/// assert_eq!(ranges.len(), 2);
/// assert_eq!(ranges[0].len(), 150);
/// ```
pub fn parse_ranges(ranges: &str) -> Result<Vec<MacRange>, RangeParseError> {
    ranges
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::parse)
        .collect()
}
