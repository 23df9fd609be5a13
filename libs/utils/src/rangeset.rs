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
//! A set of unsigned integers stored as disjoint, coalesced half-open ranges.
//!
//! Dense sets (such as a pool of consecutive hardware addresses) are stored in
//! a handful of ranges regardless of their cardinality. Membership tests are
//! binary searches, bulk insertion and removal touch only the affected ranges.

use std::{cmp::Ordering, iter::Sum};

use num_traits::{ConstOne, ConstZero, NumCast, PrimInt, Unsigned};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bound for values that can be stored in a [RangeSet].
pub trait RangeValue: PrimInt + ConstOne + ConstZero + Unsigned + Sum<Self> {}

impl<T: PrimInt + ConstOne + ConstZero + Unsigned + Sum<T>> RangeValue for T {}

/// Errors that can occur when removing a value from a range set.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RemoveError<T> {
    /// Value not in set.
    #[error("value {0} not in set")]
    ValueNotInSet(T),
}

/// Errors that can occur when inserting a value into a range set.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InsertError<T> {
    /// Value already in set.
    #[error("value {0} already in set")]
    ValueAlreadyInSet(T),
}

/// Rangeset creation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NewRangeSetError {
    /// Invalid ranges.
    #[error("ranges must be non-empty, non-overlapping and sorted by start")]
    InvalidRanges,
}

/// A set of unsigned integers.
///
/// Invariant: `ranges` is sorted by start, every range is non-empty and two
/// consecutive ranges are separated by at least one value that is not in the
/// set (adjacent ranges are always merged).
#[derive(Debug, Eq, PartialEq, Serialize, Deserialize, Clone)]
pub struct RangeSet<T: RangeValue> {
    ranges: Vec<Range<T>>,
}

impl<T: RangeValue> Default for RangeSet<T> {
    fn default() -> Self {
        Self { ranges: Vec::new() }
    }
}

impl<T: RangeValue> RangeSet<T> {
    /// Creates a new set from ranges that are already sorted by start and do not
    /// overlap. Adjacent ranges are merged.
    pub fn new(ranges: Vec<Range<T>>) -> Result<Self, NewRangeSetError> {
        let mut set = Self::default();
        for (i, range) in ranges.iter().enumerate() {
            if range.is_empty() || (i > 0 && ranges[i - 1].end > range.start) {
                return Err(NewRangeSetError::InvalidRanges);
            }
            set.insert_range(range.start, range.end);
        }
        Ok(set)
    }

    /// Returns true if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Returns the number of values in the set.
    pub fn len(&self) -> T {
        self.ranges.iter().map(Range::len).sum()
    }

    /// Returns true if the value is contained in the set.
    pub fn contains(&self, value: T) -> bool {
        self.ranges
            .binary_search_by(|range| range.compare(&value))
            .is_ok()
    }

    /// Inserts a single value.
    pub fn insert(&mut self, value: T) -> Result<(), InsertError<T>> {
        if self.contains(value) {
            return Err(InsertError::ValueAlreadyInSet(value));
        }
        self.insert_range(value, value + T::ONE);
        Ok(())
    }

    /// Inserts all values of `[start, end)`, merging with existing ranges.
    ///
    /// Values already present are left untouched. Returns how many values were
    /// newly added.
    pub fn insert_range(&mut self, start: T, end: T) -> T {
        if start >= end {
            return T::ZERO;
        }
        // ranges[lo..hi] overlap or touch [start, end)
        let lo = self.ranges.partition_point(|r| r.end < start);
        let hi = self.ranges.partition_point(|r| r.start <= end);
        if lo == hi {
            self.ranges.insert(lo, Range::new(start, end));
            return end - start;
        }

        let merged = Range::new(
            start.min(self.ranges[lo].start),
            end.max(self.ranges[hi - 1].end),
        );
        let covered: T = self.ranges[lo..hi].iter().map(Range::len).sum();
        let added = merged.len() - covered;
        self.ranges.splice(lo..hi, [merged]);
        added
    }

    /// Removes a single value.
    pub fn remove(&mut self, value: T) -> Result<(), RemoveError<T>> {
        if !self.contains(value) {
            return Err(RemoveError::ValueNotInSet(value));
        }
        self.remove_range(value, value + T::ONE);
        Ok(())
    }

    /// Removes all values of `[start, end)` that are in the set, splitting
    /// ranges where needed. Returns how many values were removed.
    pub fn remove_range(&mut self, start: T, end: T) -> T {
        if start >= end {
            return T::ZERO;
        }
        // ranges[lo..hi] intersect [start, end)
        let lo = self.ranges.partition_point(|r| r.end <= start);
        let hi = self.ranges.partition_point(|r| r.start < end);
        if lo >= hi {
            return T::ZERO;
        }

        let removed: T = self.ranges[lo..hi]
            .iter()
            .map(|r| r.end.min(end) - r.start.max(start))
            .sum();

        let mut remainder = Vec::with_capacity(2);
        if self.ranges[lo].start < start {
            remainder.push(Range::new(self.ranges[lo].start, start));
        }
        if self.ranges[hi - 1].end > end {
            remainder.push(Range::new(end, self.ranges[hi - 1].end));
        }
        self.ranges.splice(lo..hi, remainder);
        removed
    }

    /// Removes and returns up to `n` of the smallest values, in ascending order.
    pub fn take_first(&mut self, n: usize) -> Vec<T> {
        let mut taken = Vec::with_capacity(n.min(self.len().to_usize().unwrap_or(n)));
        while taken.len() < n {
            let Some(first) = self.ranges.first_mut() else {
                break;
            };
            let wanted = <T as NumCast>::from(n - taken.len()).unwrap_or(T::max_value());
            let count = wanted.min(first.len());
            let mut value = first.start;
            first.start = first.start + count;
            while value < first.start {
                taken.push(value);
                value = value + T::ONE;
            }
            if first.is_empty() {
                self.ranges.remove(0);
            }
        }
        taken
    }

    /// Returns the nth smallest value in the set.
    pub fn nth(&self, mut n: T) -> Option<T> {
        for range in self.ranges.iter() {
            if n < range.len() {
                return range.nth(n);
            }
            n = n - range.len();
        }
        None
    }

    /// Iterates over all values in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.ranges.iter().flat_map(|range| range.iter())
    }

    /// Returns the ranges in the set.
    pub fn ranges(&self) -> &[Range<T>] {
        &self.ranges
    }
}

/// A half-open range `[start, end)` of unsigned integers.
#[derive(Debug, Eq, PartialEq, Serialize, Deserialize, Clone, Copy)]
pub struct Range<T> {
    /// First value of the range.
    pub start: T,
    /// One past the last value of the range.
    pub end: T,
}

impl<T: RangeValue> Range<T> {
    /// Creates a new range.
    pub fn new(start: T, end: T) -> Self {
        Self { start, end }
    }

    /// Locates `value` relative to the range, for binary searches.
    pub fn compare(&self, value: &T) -> Ordering {
        if self.start > *value {
            Ordering::Greater
        } else if self.end <= *value {
            Ordering::Less
        } else {
            Ordering::Equal
        }
    }

    /// Returns true if the range contains `value`.
    pub fn contains(&self, value: T) -> bool {
        self.compare(&value) == Ordering::Equal
    }

    /// Number of values in the range.
    pub fn len(&self) -> T {
        if self.end > self.start {
            self.end - self.start
        } else {
            T::ZERO
        }
    }

    /// Returns true if the range holds no value.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Returns the n-th value in the range.
    pub fn nth(&self, n: T) -> Option<T> {
        (n < self.len()).then(|| self.start + n)
    }

    /// Iterates over the values of the range in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = T> + use<T> {
        let end = self.end;
        std::iter::successors(
            (!self.is_empty()).then_some(self.start),
            move |value| {
                let next = *value + T::ONE;
                (next < end).then_some(next)
            },
        )
    }
}
