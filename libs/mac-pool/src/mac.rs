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
//! MAC addresses and address ranges.

use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of the canonical textual form, e.g. `00:1a:4a:16:01:51`.
const TEXT_LEN: usize = 17;

/// Error returned when parsing a MAC address from text fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid MAC address {0:?}, expected six colon separated hex octets")]
pub struct MacParseError(pub String);

/// Error returned when parsing a MAC address range from text fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RangeParseError {
    /// The entry is not of the form `<mac>-<mac>`.
    #[error("invalid MAC range {0:?}, expected <mac>-<mac>")]
    MissingSeparator(String),
    /// One of the range bounds is not a valid MAC address.
    #[error("invalid bound in MAC range {entry:?}")]
    InvalidBound {
        /// The offending range entry.
        entry: String,
        /// The underlying parse error.
        #[source]
        source: MacParseError,
    },
}

/// A 48-bit hardware address.
///
/// Ordering follows the numeric value, which is also the order of the
/// canonical textual form.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[repr(transparent)]
pub struct MacAddress(u64);

impl MacAddress {
    /// The number of bits in a MAC address.
    pub const BITS: u32 = 48;

    /// The all-zero address.
    pub const ZERO: Self = Self(0);

    /// The largest MAC address, `ff:ff:ff:ff:ff:ff`.
    pub const MAX: Self = Self((1u64 << Self::BITS) - 1);

    /// Creates an address from its numeric value, or `None` if the value does
    /// not fit into 48 bits.
    ///
    /// # Examples
    ///
    /// ```
    /// # use mac_pool::MacAddress;
    /// assert_eq!(MacAddress::new(0x1a4a).unwrap().to_string(), "00:00:00:00:1a:4a");
    /// assert!(MacAddress::new(1 << 48).is_none());
    /// ```
    pub const fn new(value: u64) -> Option<Self> {
        if value > Self::MAX.0 {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Creates an address from the lower 48 bits of `value`.
    pub const fn from_u64_truncating(value: u64) -> Self {
        Self(value & Self::MAX.0)
    }

    /// Returns the numeric value.
    pub const fn to_u64(self) -> u64 {
        self.0
    }

    /// Creates an address from its six octets, most significant first.
    pub const fn from_octets(octets: [u8; 6]) -> Self {
        let mut value = 0u64;
        let mut i = 0;
        while i < 6 {
            value = (value << 8) | octets[i] as u64;
            i += 1;
        }
        Self(value)
    }

    /// Returns the six octets, most significant first.
    pub const fn octets(self) -> [u8; 6] {
        let bytes = self.0.to_be_bytes();
        [bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7]]
    }
}

impl Display for MacAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.octets();
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for MacAddress {
    type Err = MacParseError;

    /// Parses the canonical form. Hex digits may be upper or lower case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || MacParseError(s.to_string());
        let bytes = s.as_bytes();
        if bytes.len() != TEXT_LEN {
            return Err(err());
        }

        let mut octets = [0u8; 6];
        for (i, octet) in octets.iter_mut().enumerate() {
            let pos = i * 3;
            if i > 0 && bytes[pos - 1] != b':' {
                return Err(err());
            }
            let (hi, lo) = (hex_value(bytes[pos]), hex_value(bytes[pos + 1]));
            match (hi, lo) {
                (Some(hi), Some(lo)) => *octet = (hi << 4) | lo,
                _ => return Err(err()),
            }
        }
        Ok(Self::from_octets(octets))
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl TryFrom<String> for MacAddress {
    type Error = MacParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.to_string()
    }
}

/// A closed range `[min, max]` of MAC addresses.
///
/// A range with `min > max` is valid but holds no address.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacRange {
    /// Smallest address of the range.
    pub min: MacAddress,
    /// Largest address of the range.
    pub max: MacAddress,
}

impl MacRange {
    /// Creates a new range.
    pub const fn new(min: MacAddress, max: MacAddress) -> Self {
        Self { min, max }
    }

    /// Returns true if `mac` lies within the range.
    pub fn contains(&self, mac: MacAddress) -> bool {
        self.min <= mac && mac <= self.max
    }

    /// Number of addresses in the range.
    pub fn len(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            self.max.0 - self.min.0 + 1
        }
    }

    /// Returns true if the range holds no address.
    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    /// Returns the range as half-open numeric bounds `[start, end)`.
    pub(crate) fn bounds(&self) -> (u64, u64) {
        (self.min.0, self.max.0 + 1)
    }
}

impl Display for MacRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

impl FromStr for MacRange {
    type Err = RangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (min, max) = s
            .split_once('-')
            .ok_or_else(|| RangeParseError::MissingSeparator(s.to_string()))?;
        let bound = |text: &str| {
            text.trim().parse::<MacAddress>().map_err(|source| {
                RangeParseError::InvalidBound {
                    entry: s.to_string(),
                    source,
                }
            })
        };
        Ok(Self::new(bound(min)?, bound(max)?))
    }
}
