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
//! Bookkeeping of available and in-use MAC addresses.

use std::collections::{BTreeMap, btree_map::Entry};

use engine_utils::rangeset::RangeSet;
use serde::{Deserialize, Serialize};

use crate::mac::{MacAddress, MacRange};

/// Whether an address may be held by more than one user at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// An address has at most one holder.
    #[default]
    Reject,
    /// An address may have any number of holders.
    Allow,
}

impl DuplicatePolicy {
    /// Maps the `allow duplicates` configuration flag to a policy.
    pub fn from_allow_duplicates(allow_duplicates: bool) -> Self {
        if allow_duplicates {
            DuplicatePolicy::Allow
        } else {
            DuplicatePolicy::Reject
        }
    }

    /// Returns true for [DuplicatePolicy::Allow].
    pub fn allows_duplicates(self) -> bool {
        self == DuplicatePolicy::Allow
    }

    /// Decides whether an address that currently has `holders` holders may be
    /// claimed once more.
    fn admits(self, holders: usize) -> bool {
        match self {
            DuplicatePolicy::Reject => holders == 0,
            DuplicatePolicy::Allow => true,
        }
    }
}

/// Storage of the MAC addresses of a pool.
///
/// Tracks which addresses of the configured ranges are available and which
/// are in use, together with the number of holders of every in-use address.
/// Addresses outside of the configured ranges can be in use (force-added) but
/// never become available.
///
/// The storage does no locking. Callers serialize access.
// Impl Note:
// available and in_use are disjoint at all times. An address moves from
// available to in_use on its first holder and back on its last release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressStorage {
    /// Configured ranges, in configuration order.
    ranges: Vec<MacRange>,
    available: RangeSet<u64>,
    /// Holder count per in-use address, always > 0.
    in_use: BTreeMap<MacAddress, usize>,
    policy: DuplicatePolicy,
}

impl AddressStorage {
    /// Creates an empty storage.
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            ranges: Vec::new(),
            available: RangeSet::default(),
            in_use: BTreeMap::new(),
            policy,
        }
    }

    /// Adds all addresses of `range` that are neither available nor in use.
    ///
    /// Overlapping ranges are fine: capacity is never counted twice. Returns
    /// the number of newly available addresses.
    pub fn add_range(&mut self, range: MacRange) -> u64 {
        self.ranges.push(range);
        if range.is_empty() {
            tracing::warn!(%range, "Ignoring MAC range without addresses");
            return 0;
        }

        let (start, end) = range.bounds();
        let mut added = 0;
        let mut cursor = start;
        for mac in self.in_use.range(range.min..=range.max).map(|(mac, _)| *mac) {
            added += self.available.insert_range(cursor, mac.to_u64());
            cursor = mac.to_u64() + 1;
        }
        added += self.available.insert_range(cursor, end);

        tracing::debug!(%range, added, "Added MAC range");
        added
    }

    /// Returns true if at least one address is available.
    pub fn available_mac_exists(&self) -> bool {
        !self.available.is_empty()
    }

    /// Returns the number of available addresses.
    pub fn available_macs_count(&self) -> u64 {
        self.available.len()
    }

    /// Allocates up to `count` available addresses, smallest first.
    ///
    /// If fewer than `count` addresses are available, all of them are
    /// allocated. The result is sorted ascending.
    pub fn allocate_available_macs(&mut self, count: usize) -> Vec<MacAddress> {
        let macs: Vec<MacAddress> = self
            .available
            .take_first(count)
            .into_iter()
            .map(MacAddress::from_u64_truncating)
            .collect();
        for mac in &macs {
            *self.in_use.entry(*mac).or_default() += 1;
        }
        macs
    }

    /// Releases one holder of `mac`.
    ///
    /// After the last holder is released the address becomes available again
    /// if it lies within a configured range. Freeing an address that is not in
    /// use does nothing.
    pub fn free_mac(&mut self, mac: MacAddress) {
        let Entry::Occupied(mut entry) = self.in_use.entry(mac) else {
            tracing::debug!(%mac, "Freeing MAC that is not in use");
            return;
        };

        *entry.get_mut() -= 1;
        if *entry.get() > 0 {
            return;
        }
        entry.remove();
        if self.is_in_range(mac) {
            let value = mac.to_u64();
            self.available.insert_range(value, value + 1);
        }
    }

    /// Claims `mac` respecting the duplicate policy.
    ///
    /// Returns false and leaves the storage untouched if the policy rejects the
    /// claim.
    pub fn use_mac(&mut self, mac: MacAddress) -> bool {
        let holders = self.in_use.get(&mac).copied().unwrap_or_default();
        if !self.policy.admits(holders) {
            return false;
        }
        self.use_mac_no_duplicity_check(mac);
        true
    }

    /// Claims `mac` regardless of the duplicate policy.
    pub fn use_mac_no_duplicity_check(&mut self, mac: MacAddress) {
        let value = mac.to_u64();
        self.available.remove_range(value, value + 1);
        *self.in_use.entry(mac).or_default() += 1;
    }

    /// Returns true if `mac` has at least one holder.
    pub fn is_mac_in_use(&self, mac: MacAddress) -> bool {
        self.in_use.contains_key(&mac)
    }

    /// Returns the number of holders of `mac`.
    pub fn holders(&self, mac: MacAddress) -> usize {
        self.in_use.get(&mac).copied().unwrap_or_default()
    }

    /// Returns the number of distinct addresses in use.
    pub fn in_use_count(&self) -> usize {
        self.in_use.len()
    }

    /// Returns true if `mac` lies within a configured range.
    pub fn is_in_range(&self, mac: MacAddress) -> bool {
        self.ranges.iter().any(|range| range.contains(mac))
    }

    /// The configured ranges.
    pub fn ranges(&self) -> &[MacRange] {
        &self.ranges
    }

    /// The duplicate policy.
    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Available addresses as closed ranges, ascending.
    pub(crate) fn available_ranges(&self) -> impl Iterator<Item = MacRange> + '_ {
        self.available.ranges().iter().map(|r| {
            MacRange::new(
                MacAddress::from_u64_truncating(r.start),
                MacAddress::from_u64_truncating(r.end - 1),
            )
        })
    }

    /// In-use addresses with their holder counts, ascending.
    pub(crate) fn in_use_entries(&self) -> impl Iterator<Item = (MacAddress, usize)> + '_ {
        self.in_use.iter().map(|(mac, holders)| (*mac, *holders))
    }
}
