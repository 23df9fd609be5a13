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
//! Concurrent use of a MAC pool.

use std::{
    collections::BTreeSet,
    sync::{Arc, Barrier},
    thread,
};

use engine_audit::{AuditEvent, ChannelAuditSink, NoopAuditSink};
use mac_pool::{MacAddress, MacPool, MacPoolError, MacRange, RangePoolManager};
use test_log::test;

const THREADS: usize = 64;

fn pool_of(size: u64, audit: Arc<dyn engine_audit::AuditSink>) -> Arc<RangePoolManager> {
    let min = MacAddress::new(0x001a_4a16_0000).unwrap();
    let max = MacAddress::new(min.to_u64() + size - 1).unwrap();
    Arc::new(RangePoolManager::new([MacRange::new(min, max)], false, audit).unwrap())
}

#[test]
#[ntest::timeout(10_000)]
fn concurrent_single_allocations_are_distinct() {
    let (sink, mut events) = ChannelAuditSink::new();
    let pool = pool_of(THREADS as u64, Arc::new(sink));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let pool = pool.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                pool.allocate_new_mac()
            })
        })
        .collect();

    let macs: Vec<MacAddress> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap().expect("pool has one address per thread"))
        .collect();

    let distinct: BTreeSet<_> = macs.iter().copied().collect();
    assert_eq!(distinct.len(), THREADS, "duplicate hand-out: {macs:?}");
    assert_eq!(pool.available_macs_count(), 0);
    assert!(macs.iter().all(|mac| pool.is_mac_in_use(*mac)));
    assert_eq!(pool.allocate_new_mac(), Err(MacPoolError::PoolExhausted));

    // the last allocation and the failed one both found the pool empty
    let empty_reports = std::iter::from_fn(|| events.try_recv().ok())
        .filter(|event| *event == AuditEvent::MacPoolEmpty)
        .count();
    assert_eq!(empty_reports, 2);
}

#[test]
#[ntest::timeout(10_000)]
fn concurrent_batches_do_not_interleave() {
    const BATCH: usize = 16;
    let pool = pool_of((THREADS * BATCH) as u64, Arc::new(NoopAuditSink));

    let batches: Vec<Vec<MacAddress>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| scope.spawn(|| pool.allocate_mac_addresses(BATCH)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut all = BTreeSet::new();
    for batch in &batches {
        assert_eq!(batch.len(), BATCH);
        // a batch is taken under one lock, so it is a contiguous run
        for pair in batch.windows(2) {
            assert_eq!(pair[0].to_u64() + 1, pair[1].to_u64());
        }
        all.extend(batch.iter().copied());
    }
    assert_eq!(all.len(), THREADS * BATCH);
    assert_eq!(pool.available_macs_count(), 0);
}

#[test]
#[ntest::timeout(10_000)]
fn concurrent_claims_and_frees_keep_pool_consistent() {
    const ROUNDS: usize = 200;
    let pool = pool_of(8, Arc::new(NoopAuditSink));
    let contested = MacAddress::new(0x001a_4a16_0003).unwrap();

    let successful_claims: usize = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    let mut won = 0;
                    for _ in 0..ROUNDS {
                        if pool.add_mac(contested) {
                            won += 1;
                            assert!(pool.is_mac_in_use(contested));
                            pool.free_mac(contested);
                        }
                        let _ = pool.available_macs_count();
                    }
                    won
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });

    assert!(successful_claims > 0);
    assert!(!pool.is_mac_in_use(contested));
    assert_eq!(pool.available_macs_count(), 8);
}
