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
//! Data transfer objects (DTOs) for reporting the state of a MAC pool.

use serde::{Deserialize, Serialize};

use crate::{
    mac::{MacAddress, MacRange},
    storage::{AddressStorage, DuplicatePolicy},
};

/// Point-in-time view of a MAC pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacPoolSnapshot {
    /// The duplicate policy of the pool.
    pub policy: DuplicatePolicy,
    /// Configured ranges.
    pub ranges: Vec<MacRange>,
    /// Number of available addresses.
    pub available_count: u64,
    /// Available addresses as closed ranges.
    pub available: Vec<MacRange>,
    /// Addresses in use.
    pub in_use: Vec<InUseMacDto>,
}

/// An address in use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InUseMacDto {
    /// The address.
    pub mac: MacAddress,
    /// Number of holders of the address.
    pub holders: usize,
}

impl From<&AddressStorage> for MacPoolSnapshot {
    fn from(storage: &AddressStorage) -> Self {
        MacPoolSnapshot {
            policy: storage.policy(),
            ranges: storage.ranges().to_vec(),
            available_count: storage.available_macs_count(),
            available: storage.available_ranges().collect(),
            in_use: storage
                .in_use_entries()
                .map(|(mac, holders)| InUseMacDto { mac, holders })
                .collect(),
        }
    }
}
