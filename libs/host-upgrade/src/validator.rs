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
//! Preconditions of host upgrades.

use thiserror::Error;

use crate::host::{Host, HostStatus};

/// A failed upgrade precondition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UpgradeValidationError {
    /// The host does not exist.
    #[error("host does not exist")]
    HostNotFound,
    /// The host status does not permit an upgrade.
    #[error("cannot upgrade host in status {0}")]
    UpgradeStatusIllegal(HostStatus),
    /// The host status does not permit an upgrade check.
    #[error("cannot check for upgrades of host in status {0}")]
    CheckStatusIllegal(HostStatus),
    /// There is nothing to upgrade.
    #[error("there are no available updates for the host")]
    NoUpdatesAvailable,
    /// Image-based nodes need an image to upgrade to.
    #[error("cannot upgrade node, image file is missing")]
    MissingImage,
    /// The host has no operating system yet.
    #[error("cannot upgrade host that was never installed")]
    HostNotInstalled,
}

/// Checks preconditions of upgrading a host.
#[derive(Debug, Clone, Copy)]
pub struct UpgradeHostValidator<'a> {
    host: Option<&'a Host>,
}

impl<'a> UpgradeHostValidator<'a> {
    /// Creates a validator for a host that may not exist.
    pub fn new(host: Option<&'a Host>) -> Self {
        Self { host }
    }

    fn host(&self) -> Result<&'a Host, UpgradeValidationError> {
        self.host.ok_or(UpgradeValidationError::HostNotFound)
    }

    /// The host exists.
    pub fn host_exists(&self) -> Result<(), UpgradeValidationError> {
        self.host().map(|_| ())
    }

    /// The host status permits an upgrade.
    pub fn status_supported_for_host_upgrade(&self) -> Result<(), UpgradeValidationError> {
        let host = self.host()?;
        if host.status.can_upgrade() {
            Ok(())
        } else {
            Err(UpgradeValidationError::UpgradeStatusIllegal(host.status))
        }
    }

    /// The host status permits checking for upgrades.
    pub fn status_supported_for_host_upgrade_check(&self) -> Result<(), UpgradeValidationError> {
        let host = self.host()?;
        if host.status.can_check_for_upgrade() {
            Ok(())
        } else {
            Err(UpgradeValidationError::CheckStatusIllegal(host.status))
        }
    }

    /// The host is in maintenance, as required by the upgrade step itself.
    pub fn status_supported_for_host_upgrade_internal(&self) -> Result<(), UpgradeValidationError> {
        let host = self.host()?;
        match host.status {
            HostStatus::Maintenance => Ok(()),
            status => Err(UpgradeValidationError::UpgradeStatusIllegal(status)),
        }
    }

    /// There are updates to install. Vintage nodes always qualify.
    pub fn updates_available(&self) -> Result<(), UpgradeValidationError> {
        let host = self.host()?;
        if host.is_vintage_node() || host.update_available {
            Ok(())
        } else {
            Err(UpgradeValidationError::NoUpdatesAvailable)
        }
    }

    /// Vintage nodes are given a non-blank image.
    pub fn image_provided_for_node(&self, image: Option<&str>) -> Result<(), UpgradeValidationError> {
        let host = self.host()?;
        let blank = image.is_none_or(|image| image.trim().is_empty());
        if host.is_vintage_node() && blank {
            Err(UpgradeValidationError::MissingImage)
        } else {
            Ok(())
        }
    }

    /// The host has an operating system.
    pub fn host_was_installed(&self) -> Result<(), UpgradeValidationError> {
        match self.host()?.host_os {
            Some(_) => Ok(()),
            None => Err(UpgradeValidationError::HostNotInstalled),
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::host::HostType;

    fn host(host_type: HostType, status: HostStatus) -> Host {
        Host {
            id: Uuid::new_v4(),
            name: "host-1".to_string(),
            hostname: "host-1.example.com".to_string(),
            host_type,
            status,
            update_available: false,
            host_os: Some("RHEL - 9.4".to_string()),
        }
    }

    #[test]
    fn missing_host_fails_every_check() {
        let validator = UpgradeHostValidator::new(None);
        assert_eq!(validator.host_exists(), Err(UpgradeValidationError::HostNotFound));
        assert_eq!(
            validator.updates_available(),
            Err(UpgradeValidationError::HostNotFound)
        );
    }

    #[test]
    fn status_checks() {
        let up = host(HostType::Vds, HostStatus::Up);
        let validator = UpgradeHostValidator::new(Some(&up));
        assert_eq!(validator.status_supported_for_host_upgrade(), Ok(()));
        assert_eq!(validator.status_supported_for_host_upgrade_check(), Ok(()));
        assert_eq!(
            validator.status_supported_for_host_upgrade_internal(),
            Err(UpgradeValidationError::UpgradeStatusIllegal(HostStatus::Up))
        );

        let installing = host(HostType::Vds, HostStatus::Installing);
        let validator = UpgradeHostValidator::new(Some(&installing));
        assert_eq!(
            validator.status_supported_for_host_upgrade(),
            Err(UpgradeValidationError::UpgradeStatusIllegal(
                HostStatus::Installing
            ))
        );
        assert_eq!(
            validator.status_supported_for_host_upgrade_check(),
            Err(UpgradeValidationError::CheckStatusIllegal(
                HostStatus::Installing
            ))
        );

        let maintenance = host(HostType::Vds, HostStatus::Maintenance);
        let validator = UpgradeHostValidator::new(Some(&maintenance));
        assert_eq!(validator.status_supported_for_host_upgrade_internal(), Ok(()));
    }

    #[test]
    fn updates_and_image() {
        let mut vds = host(HostType::Vds, HostStatus::Maintenance);
        assert_eq!(
            UpgradeHostValidator::new(Some(&vds)).updates_available(),
            Err(UpgradeValidationError::NoUpdatesAvailable)
        );
        vds.update_available = true;
        assert_eq!(UpgradeHostValidator::new(Some(&vds)).updates_available(), Ok(()));
        assert_eq!(
            UpgradeHostValidator::new(Some(&vds)).image_provided_for_node(None),
            Ok(())
        );

        let vintage = host(HostType::VintageNode, HostStatus::Maintenance);
        let validator = UpgradeHostValidator::new(Some(&vintage));
        assert_eq!(validator.updates_available(), Ok(()));
        assert_eq!(
            validator.image_provided_for_node(Some("  ")),
            Err(UpgradeValidationError::MissingImage)
        );
        assert_eq!(validator.image_provided_for_node(Some("node.iso")), Ok(()));
    }

    #[test]
    fn host_without_os_was_not_installed() {
        let mut fresh = host(HostType::Node, HostStatus::Maintenance);
        fresh.host_os = None;
        assert_eq!(
            UpgradeHostValidator::new(Some(&fresh)).host_was_installed(),
            Err(UpgradeValidationError::HostNotInstalled)
        );
    }
}
