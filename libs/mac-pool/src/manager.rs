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
//! Thread-safe MAC pool over configured address ranges.

use std::{
    fmt,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use engine_audit::{AuditEvent, AuditSink};
use thiserror::Error;

use crate::{
    config::MacPoolConfig,
    dto::MacPoolSnapshot,
    mac::{MacAddress, MacRange, RangeParseError},
    storage::{AddressStorage, DuplicatePolicy},
};

/// MAC pool initialization errors. These are fatal, the pool cannot be used.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolInitError {
    /// The configured ranges contain no address.
    #[error("MAC pool initialization failed: the configured ranges contain no address")]
    NoAvailableAddresses,
    /// The textual range configuration is malformed.
    #[error("invalid MAC pool ranges")]
    InvalidRanges(#[from] RangeParseError),
}

/// MAC pool operation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MacPoolError {
    /// All addresses are in use.
    #[error("no MAC addresses left in the pool")]
    PoolExhausted,
}

/// MacPool is the interface network interface provisioning uses to obtain and
/// release MAC addresses.
pub trait MacPool: Send + Sync {
    /// Allocates one address.
    fn allocate_new_mac(&self) -> Result<MacAddress, MacPoolError>;

    /// Allocates up to `count` addresses as one atomic batch.
    ///
    /// The result is sorted ascending and is shorter than `count` if the pool
    /// ran out of addresses. Callers must check its length.
    fn allocate_mac_addresses(&self, count: usize) -> Vec<MacAddress>;

    /// Returns the number of available addresses. The value may be stale as
    /// soon as it is returned and is not a reservation.
    fn available_macs_count(&self) -> u64;

    /// Releases an address.
    fn free_mac(&self, mac: MacAddress);

    /// Releases a batch of addresses.
    fn free_macs(&self, macs: &[MacAddress]);

    /// Claims a specific address respecting the duplicate policy. Returns
    /// whether the claim succeeded.
    fn add_mac(&self, mac: MacAddress) -> bool;

    /// Claims a specific address regardless of the duplicate policy.
    fn force_add_mac(&self, mac: MacAddress);

    /// Returns true if the address is in use.
    fn is_mac_in_use(&self, mac: MacAddress) -> bool;

    /// Returns true if an address may be in use more than once.
    fn is_duplicate_mac_addresses_allowed(&self) -> bool;
}

/// A [MacPool] over one or more address ranges.
///
/// All access to the address storage is serialized by a single reader/writer
/// lock: mutations take the write lock, queries the read lock. Whenever a
/// mutation that hands out addresses leaves the pool without available
/// addresses, an [AuditEvent::MacPoolEmpty] is emitted after the lock has been
/// released.
pub struct RangePoolManager {
    storage: RwLock<AddressStorage>,
    allow_duplicates: bool,
    audit: Arc<dyn AuditSink>,
}

impl fmt::Debug for RangePoolManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RangePoolManager")
            .field("storage", &self.storage)
            .field("allow_duplicates", &self.allow_duplicates)
            .finish_non_exhaustive()
    }
}

impl RangePoolManager {
    /// Creates a pool over the given ranges.
    ///
    /// Fails with [PoolInitError::NoAvailableAddresses] if the ranges contain
    /// no address at all.
    pub fn new(
        ranges: impl IntoIterator<Item = MacRange>,
        allow_duplicates: bool,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, PoolInitError> {
        tracing::info!(allow_duplicates, "Start initializing MAC pool");

        let mut storage =
            AddressStorage::new(DuplicatePolicy::from_allow_duplicates(allow_duplicates));
        for range in ranges {
            storage.add_range(range);
        }
        if !storage.available_mac_exists() {
            tracing::error!("MAC pool initialization failed, no available address");
            return Err(PoolInitError::NoAvailableAddresses);
        }

        tracing::info!(
            available = storage.available_macs_count(),
            "Finished initializing MAC pool"
        );
        Ok(Self {
            storage: RwLock::new(storage),
            allow_duplicates,
            audit,
        })
    }

    /// Creates a pool from its textual configuration.
    pub fn from_config(
        config: &MacPoolConfig,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, PoolInitError> {
        let ranges = config.parse_ranges()?;
        Self::new(ranges, config.allow_duplicates, audit)
    }

    /// Returns a point-in-time view of the pool.
    pub fn snapshot(&self) -> MacPoolSnapshot {
        MacPoolSnapshot::from(&*self.read())
    }

    // The storage has no operation that can panic half-way, so a poisoned lock
    // still guards a consistent storage.
    fn read(&self) -> RwLockReadGuard<'_, AddressStorage> {
        self.storage.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, AddressStorage> {
        self.storage.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn report_if_exhausted(&self, exhausted: bool) {
        if exhausted {
            self.audit.emit(AuditEvent::MacPoolEmpty);
        }
    }
}

impl MacPool for RangePoolManager {
    fn allocate_new_mac(&self) -> Result<MacAddress, MacPoolError> {
        self.allocate_mac_addresses(1)
            .into_iter()
            .next()
            .ok_or(MacPoolError::PoolExhausted)
    }

    fn allocate_mac_addresses(&self, count: usize) -> Vec<MacAddress> {
        let (macs, exhausted) = {
            let mut storage = self.write();
            let mut macs = storage.allocate_available_macs(count);
            macs.sort_unstable();
            (macs, !storage.available_mac_exists())
        };

        if macs.len() < count {
            tracing::warn!(
                requested = count,
                allocated = macs.len(),
                "MAC pool could not satisfy the whole request"
            );
        }
        self.report_if_exhausted(exhausted);
        macs
    }

    fn available_macs_count(&self) -> u64 {
        let available = self.read().available_macs_count();
        tracing::debug!(available, "Number of available MAC addresses");
        available
    }

    fn free_mac(&self, mac: MacAddress) {
        self.write().free_mac(mac);
    }

    fn free_macs(&self, macs: &[MacAddress]) {
        let mut storage = self.write();
        for mac in macs {
            storage.free_mac(*mac);
        }
    }

    fn add_mac(&self, mac: MacAddress) -> bool {
        let (added, exhausted) = {
            let mut storage = self.write();
            let added = storage.use_mac(mac);
            (added, !storage.available_mac_exists())
        };
        if !added {
            tracing::debug!(%mac, "MAC address already in use");
        }
        self.report_if_exhausted(exhausted);
        added
    }

    fn force_add_mac(&self, mac: MacAddress) {
        let exhausted = {
            let mut storage = self.write();
            storage.use_mac_no_duplicity_check(mac);
            !storage.available_mac_exists()
        };
        self.report_if_exhausted(exhausted);
    }

    fn is_mac_in_use(&self, mac: MacAddress) -> bool {
        self.read().is_mac_in_use(mac)
    }

    fn is_duplicate_mac_addresses_allowed(&self) -> bool {
        self.allow_duplicates
    }
}
