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
//! # MAC Pool
//!
//! Hand out MAC addresses to virtual network interfaces.
//!
//! The [manager::RangePoolManager] is the thread-safe entry point. It
//! implements [manager::MacPool] and allocates from one or more configured
//! [mac::MacRange]s.
//!
//! The bookkeeping of which address is available and which is in use is done
//! by [storage::AddressStorage], which does no locking of its own.

pub mod config;
pub mod dto;
pub mod mac;
pub mod manager;
pub mod storage;

pub use mac::{MacAddress, MacParseError, MacRange};
pub use manager::{MacPool, MacPoolError, PoolInitError, RangePoolManager};
