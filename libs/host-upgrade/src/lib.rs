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
//! Host package upgrades.
//!
//! Hosts are checked for available package updates and upgraded by running a
//! playbook against them. The runner is abstracted by [`PlaybookExecutor`], the
//! default implementation spawns `ansible-playbook`.

pub mod host;
pub mod manager;
pub mod playbook;
pub mod validator;

pub use host::{Host, HostStatus, HostType};
pub use manager::{
    HostUpgradeConfig, HostUpgradeError, HostUpgradeManager, UpgradeCheckResult, UpgradeContext,
};
pub use playbook::{
    PlaybookCommand, PlaybookExecutor, PlaybookOutput, PlaybookReturnCode,
    ProcessPlaybookExecutor, Verbosity,
};
pub use validator::{UpgradeHostValidator, UpgradeValidationError};
