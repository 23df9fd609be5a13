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
//! Hypervisor hosts as seen by the upgrade flow.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of hypervisor host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostType {
    /// A regular host with a package-managed OS.
    Vds,
    /// An appliance node with an image-based OS.
    Node,
    /// A legacy appliance node that is upgraded by installing a full image.
    VintageNode,
}

/// Status of a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostStatus {
    /// Operational.
    Up,
    /// Switched off or not reachable on purpose.
    Down,
    /// In maintenance mode, no workload.
    Maintenance,
    /// Entering maintenance mode.
    PreparingForMaintenance,
    /// Reachable but not fit to run workload.
    NonOperational,
    /// Not answering.
    NonResponsive,
    /// Being installed.
    Installing,
    /// The last installation failed.
    InstallFailed,
    /// Rebooting.
    Reboot,
    /// Connecting for the first time.
    Connecting,
    /// Booting up.
    Initializing,
}

impl HostStatus {
    /// Statuses from which a host can be upgraded.
    pub const UPGRADE_ALLOWED: &[HostStatus] = &[
        HostStatus::Up,
        HostStatus::Maintenance,
        HostStatus::NonOperational,
        HostStatus::InstallFailed,
    ];

    /// Statuses from which a host can be checked for available upgrades.
    pub const UPGRADE_CHECK_ALLOWED: &[HostStatus] = &[
        HostStatus::Up,
        HostStatus::Maintenance,
        HostStatus::NonOperational,
        HostStatus::NonResponsive,
    ];

    /// Returns true if a host in this status can be upgraded.
    pub fn can_upgrade(self) -> bool {
        Self::UPGRADE_ALLOWED.contains(&self)
    }

    /// Returns true if a host in this status can be checked for upgrades.
    pub fn can_check_for_upgrade(self) -> bool {
        Self::UPGRADE_CHECK_ALLOWED.contains(&self)
    }
}

impl Display for HostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HostStatus::Up => "Up",
            HostStatus::Down => "Down",
            HostStatus::Maintenance => "Maintenance",
            HostStatus::PreparingForMaintenance => "PreparingForMaintenance",
            HostStatus::NonOperational => "NonOperational",
            HostStatus::NonResponsive => "NonResponsive",
            HostStatus::Installing => "Installing",
            HostStatus::InstallFailed => "InstallFailed",
            HostStatus::Reboot => "Reboot",
            HostStatus::Connecting => "Connecting",
            HostStatus::Initializing => "Initializing",
        };
        f.write_str(name)
    }
}

/// A hypervisor host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    /// Identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Network name the host is reached at.
    pub hostname: String,
    /// Kind of host.
    pub host_type: HostType,
    /// Current status.
    pub status: HostStatus,
    /// Whether the last check found package updates.
    pub update_available: bool,
    /// Installed operating system, unknown before the first installation.
    pub host_os: Option<String>,
}

impl Host {
    /// Returns true for legacy image-based nodes.
    pub fn is_vintage_node(&self) -> bool {
        self.host_type == HostType::VintageNode
    }
}
