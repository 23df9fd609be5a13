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
//! Checking hosts for package updates and applying them.

use std::{path::PathBuf, sync::Arc};

use chrono::{DateTime, Days, Utc};
use engine_audit::{AuditEvent, AuditSink};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    host::{Host, HostType},
    playbook::{PlaybookCommand, PlaybookExecutor, PlaybookReturnCode, Verbosity},
};

/// Maximum number of package names put into an audit event.
pub const MAX_NUM_OF_DISPLAYED_UPDATES: usize = 10;

const LOG_FILE_PREFIX: &str = "ovirt-host-mgmt-ansible";

/// Errors of host upgrade operations.
#[derive(Debug, Error)]
pub enum HostUpgradeError {
    /// The check playbook did not succeed.
    #[error("failed to run check-update of host '{hostname}': {stderr}")]
    CheckFailed {
        /// Host the check ran against.
        hostname: String,
        /// Captured stderr of the run.
        stderr: String,
    },
    /// The update playbook did not succeed.
    #[error("failed to update host '{hostname}'")]
    UpdateFailed {
        /// Host the update ran against.
        hostname: String,
    },
    /// The check playbook printed something other than a list of packages.
    #[error("failed to read host packages: {0}")]
    InvalidOutput(#[source] serde_json::Error),
    /// The playbook runner could not be started.
    #[error("failed to run playbook: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Settings of the upgrade flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostUpgradeConfig {
    /// Playbook performing both the check and the upgrade.
    pub playbook: PathBuf,
    /// Stdout callback plugin that prints the available packages as JSON.
    pub callback_plugin: String,
    /// Directory with the PKI material.
    pub pki_dir: PathBuf,
    /// Installation data directory.
    pub usr_dir: PathBuf,
    /// Directory for upgrade logs.
    pub log_dir: PathBuf,
    /// Organization name put into certificates.
    pub organization_name: String,
    /// Validity of newly signed host certificates.
    pub certificate_validity_years: u32,
    /// Timeout of certificate signing.
    pub sign_cert_timeout_secs: u32,
    /// Certificates expiring within this many days are renewed.
    pub cert_expiration_alert_days: u32,
}

impl Default for HostUpgradeConfig {
    fn default() -> Self {
        Self {
            playbook: PathBuf::from("ovirt-host-upgrade.yml"),
            callback_plugin: "hostupgradeplugin".to_string(),
            pki_dir: PathBuf::from("/etc/pki/ovirt-engine"),
            usr_dir: PathBuf::from("/usr/share/ovirt-engine"),
            log_dir: PathBuf::from("/var/log/ovirt-engine/host-deploy"),
            organization_name: "Test".to_string(),
            certificate_validity_years: 5,
            sign_cert_timeout_secs: 30,
            cert_expiration_alert_days: 7,
        }
    }
}

/// Per-run inputs of an upgrade that are not part of the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpgradeContext {
    /// Whether the host's cluster encrypts VNC.
    pub vnc_encryption_enabled: bool,
    /// CA certificate in PEM format.
    pub ca_certificate_pem: String,
    /// CA public key in OpenSSH format.
    pub ca_public_key_ssh: String,
    /// Correlation id of the flow, used in the log file name.
    pub correlation_id: String,
}

/// Outcome of an update check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeCheckResult {
    /// Whether any package can be updated.
    pub updates_available: bool,
    /// Packages that can be updated.
    pub available_packages: Vec<String>,
}

/// Checks hosts for updates and upgrades them through playbook runs.
pub struct HostUpgradeManager<E> {
    executor: E,
    config: HostUpgradeConfig,
    audit: Arc<dyn AuditSink>,
}

impl<E> std::fmt::Debug for HostUpgradeManager<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostUpgradeManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<E: PlaybookExecutor> HostUpgradeManager<E> {
    /// Creates a manager running playbooks through `executor`.
    pub fn new(executor: E, config: HostUpgradeConfig, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            executor,
            config,
            audit,
        }
    }

    /// Host types this manager can upgrade.
    pub fn host_types() -> &'static [HostType] {
        &[HostType::Vds, HostType::Node]
    }

    /// Lists the packages that can be updated on `host` without changing it.
    pub async fn check_for_updates(
        &self,
        host: &Host,
    ) -> Result<UpgradeCheckResult, HostUpgradeError> {
        let command = PlaybookCommand::new(&self.config.playbook)
            .hostnames([host.hostname.as_str()])
            .check_mode(true)
            .enable_logging(false)
            .verbosity(Verbosity::Level0)
            .stdout_callback(&self.config.callback_plugin);

        let output = self.executor.run(&command).await.inspect_err(|e| {
            tracing::error!(hostname = %host.hostname, error = %e, "Failed to start check-update");
        })?;
        if output.code != PlaybookReturnCode::Ok {
            tracing::error!(
                hostname = %host.hostname,
                code = ?output.code,
                stderr = %output.stderr,
                "Failed to run check-update"
            );
            return Err(HostUpgradeError::CheckFailed {
                hostname: host.hostname.clone(),
                stderr: output.stderr,
            });
        }

        let packages: Vec<String> = serde_json::from_str(&output.stdout).map_err(|e| {
            tracing::error!(hostname = %host.hostname, error = %e, "Failed to read host packages");
            tracing::debug!(stdout = %output.stdout, "Check-update output");
            HostUpgradeError::InvalidOutput(e)
        })?;

        if packages.is_empty() {
            return Ok(UpgradeCheckResult::default());
        }

        tracing::info!(
            hostname = %host.hostname,
            packages = %packages.join(", "),
            "There are available package updates"
        );
        self.audit.emit(AuditEvent::HostUpdatesAvailableWithPackages {
            host_id: host.id,
            host_name: host.name.clone(),
            packages: summarize_packages(&packages),
        });

        Ok(UpgradeCheckResult {
            updates_available: true,
            available_packages: packages,
        })
    }

    /// Upgrades the packages of `host`.
    pub async fn update(&self, host: &Host, ctx: &UpgradeContext) -> Result<(), HostUpgradeError> {
        let cutoff = allowed_expiration_cutoff(Utc::now(), self.config.cert_expiration_alert_days);
        let command = PlaybookCommand::new(&self.config.playbook)
            .hostnames([host.hostname.as_str()])
            .log_file(
                &self.config.log_dir,
                LOG_FILE_PREFIX,
                host.hostname.as_str(),
                ctx.correlation_id.as_str(),
            )
            .variable(
                "host_deploy_vnc_restart_services",
                host.host_type == HostType::Vds,
            )
            .variable("host_deploy_vnc_tls", ctx.vnc_encryption_enabled.to_string())
            .variable("ovirt_pki_dir", self.config.pki_dir.display().to_string())
            .variable("ovirt_vds_hostname", host.hostname.as_str())
            .variable("ovirt_engine_usr", self.config.usr_dir.display().to_string())
            .variable(
                "ovirt_organizationname",
                self.config.organization_name.as_str(),
            )
            .variable(
                "ovirt_vdscertificatevalidityinyears",
                self.config.certificate_validity_years,
            )
            .variable(
                "ovirt_signcerttimeoutinseconds",
                self.config.sign_cert_timeout_secs,
            )
            .variable("ovirt_time_to_check", cutoff.timestamp())
            .variable("ovirt_ca_cert", ctx.ca_certificate_pem.as_str())
            .variable("ovirt_ca_key", ctx.ca_public_key_ssh.replace('\n', ""));

        let output = self.executor.run(&command).await.inspect_err(|e| {
            tracing::error!(hostname = %host.hostname, error = %e, "Failed to start host update");
        })?;
        if output.code != PlaybookReturnCode::Ok {
            tracing::error!(hostname = %host.hostname, code = ?output.code, "Failed to update host");
            return Err(HostUpgradeError::UpdateFailed {
                hostname: host.hostname.clone(),
            });
        }
        tracing::info!(hostname = %host.hostname, "Host updated");
        Ok(())
    }
}

/// The moment certificates must stay valid until, `days` after `now`.
///
/// Saturates at the latest representable time.
pub fn allowed_expiration_cutoff(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now.checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Joins package names, listing at most [`MAX_NUM_OF_DISPLAYED_UPDATES`].
fn summarize_packages(packages: &[String]) -> String {
    if packages.len() <= MAX_NUM_OF_DISPLAYED_UPDATES {
        return packages.join(", ");
    }
    format!(
        "{} and {} others. To see all packages check engine.log.",
        packages[..MAX_NUM_OF_DISPLAYED_UPDATES].join(", "),
        packages.len() - MAX_NUM_OF_DISPLAYED_UPDATES
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;
    use engine_audit::{ChannelAuditSink, NoopAuditSink};
    use serde_json::json;
    use test_log::test;
    use uuid::Uuid;

    use super::*;
    use crate::{host::HostStatus, playbook::PlaybookOutput};

    struct FakeExecutor {
        code: PlaybookReturnCode,
        stdout: String,
        commands: Mutex<Vec<PlaybookCommand>>,
    }

    impl FakeExecutor {
        fn new(code: PlaybookReturnCode, stdout: &str) -> Arc<Self> {
            Arc::new(Self {
                code,
                stdout: stdout.to_string(),
                commands: Mutex::new(Vec::new()),
            })
        }

        fn commands(&self) -> Vec<PlaybookCommand> {
            self.commands.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PlaybookExecutor for FakeExecutor {
        async fn run(&self, command: &PlaybookCommand) -> std::io::Result<PlaybookOutput> {
            self.commands.lock().unwrap().push(command.clone());
            Ok(PlaybookOutput {
                code: self.code,
                stdout: self.stdout.clone(),
                stderr: "boom".to_string(),
            })
        }
    }

    struct BrokenExecutor;

    #[async_trait]
    impl PlaybookExecutor for BrokenExecutor {
        async fn run(&self, _command: &PlaybookCommand) -> std::io::Result<PlaybookOutput> {
            Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "ansible-playbook not found",
            ))
        }
    }

    fn host(host_type: HostType) -> Host {
        Host {
            id: Uuid::new_v4(),
            name: "host-1".to_string(),
            hostname: "host1.example.com".to_string(),
            host_type,
            status: HostStatus::Maintenance,
            update_available: false,
            host_os: Some("RHEL - 9.4".to_string()),
        }
    }

    #[test(tokio::test)]
    async fn check_reports_packages_and_emits_event() {
        let executor = FakeExecutor::new(PlaybookReturnCode::Ok, r#"["vdsm", "libvirt"]"#);
        let (sink, mut events) = ChannelAuditSink::new();
        let manager = HostUpgradeManager::new(executor.clone(), HostUpgradeConfig::default(), Arc::new(sink));
        let host = host(HostType::Vds);

        let result = manager.check_for_updates(&host).await.unwrap();
        assert!(result.updates_available);
        assert_eq!(result.available_packages, vec!["vdsm", "libvirt"]);

        assert_eq!(
            events.try_recv().unwrap(),
            AuditEvent::HostUpdatesAvailableWithPackages {
                host_id: host.id,
                host_name: "host-1".to_string(),
                packages: "vdsm, libvirt".to_string(),
            }
        );

        let commands = executor.commands();
        assert_eq!(commands.len(), 1);
        assert!(commands[0].is_check_mode());
        assert_eq!(commands[0].log_file_path(Utc::now()), None);
    }

    #[test(tokio::test)]
    async fn check_without_packages_is_silent() {
        let executor = FakeExecutor::new(PlaybookReturnCode::Ok, "[]");
        let (sink, mut events) = ChannelAuditSink::new();
        let manager = HostUpgradeManager::new(executor.clone(), HostUpgradeConfig::default(), Arc::new(sink));

        let result = manager.check_for_updates(&host(HostType::Node)).await.unwrap();
        assert_eq!(result, UpgradeCheckResult::default());
        assert!(events.try_recv().is_err());
    }

    #[test(tokio::test)]
    async fn check_failure_and_bad_output() {
        let executor = FakeExecutor::new(PlaybookReturnCode::Fail, "");
        let manager = HostUpgradeManager::new(
            executor.clone(),
            HostUpgradeConfig::default(),
            Arc::new(NoopAuditSink),
        );
        let err = manager.check_for_updates(&host(HostType::Vds)).await.unwrap_err();
        assert!(
            matches!(err, HostUpgradeError::CheckFailed { ref stderr, .. } if stderr == "boom"),
            "unexpected error: {err}"
        );

        let executor = FakeExecutor::new(PlaybookReturnCode::Ok, "not json");
        let manager = HostUpgradeManager::new(
            executor.clone(),
            HostUpgradeConfig::default(),
            Arc::new(NoopAuditSink),
        );
        let err = manager.check_for_updates(&host(HostType::Vds)).await.unwrap_err();
        assert!(matches!(err, HostUpgradeError::InvalidOutput(_)));

        let manager = HostUpgradeManager::new(
            BrokenExecutor,
            HostUpgradeConfig::default(),
            Arc::new(NoopAuditSink),
        );
        let err = manager.check_for_updates(&host(HostType::Vds)).await.unwrap_err();
        assert!(matches!(err, HostUpgradeError::Spawn(_)));
    }

    #[test(tokio::test)]
    async fn long_package_lists_are_truncated_in_events() {
        let packages: Vec<String> = (0..13).map(|i| format!("pkg{i}")).collect();
        let stdout = serde_json::to_string(&packages).unwrap();
        let executor = FakeExecutor::new(PlaybookReturnCode::Ok, &stdout);
        let (sink, mut events) = ChannelAuditSink::new();
        let manager = HostUpgradeManager::new(executor.clone(), HostUpgradeConfig::default(), Arc::new(sink));

        let result = manager.check_for_updates(&host(HostType::Vds)).await.unwrap();
        assert_eq!(result.available_packages.len(), 13);

        let AuditEvent::HostUpdatesAvailableWithPackages { packages, .. } =
            events.try_recv().unwrap()
        else {
            panic!("unexpected event");
        };
        assert_eq!(
            packages,
            "pkg0, pkg1, pkg2, pkg3, pkg4, pkg5, pkg6, pkg7, pkg8, pkg9 and 3 others. \
             To see all packages check engine.log."
        );
    }

    #[test(tokio::test)]
    async fn update_passes_host_and_pki_variables() {
        let executor = FakeExecutor::new(PlaybookReturnCode::Ok, "");
        let manager = HostUpgradeManager::new(
            executor.clone(),
            HostUpgradeConfig::default(),
            Arc::new(NoopAuditSink),
        );
        let ctx = UpgradeContext {
            vnc_encryption_enabled: true,
            ca_certificate_pem: "-----BEGIN CERTIFICATE-----".to_string(),
            ca_public_key_ssh: "ssh-rsa AAAA\nBBBB\n".to_string(),
            correlation_id: "corr-1".to_string(),
        };
        let before = Utc::now();

        manager.update(&host(HostType::Vds), &ctx).await.unwrap();

        let commands = executor.commands();
        let command = &commands[0];
        assert!(!command.is_check_mode());
        assert_eq!(
            command.get_variable("host_deploy_vnc_restart_services"),
            Some(&json!(true))
        );
        assert_eq!(command.get_variable("host_deploy_vnc_tls"), Some(&json!("true")));
        assert_eq!(
            command.get_variable("ovirt_vds_hostname"),
            Some(&json!("host1.example.com"))
        );
        assert_eq!(
            command.get_variable("ovirt_ca_key"),
            Some(&json!("ssh-rsa AAAABBBB"))
        );
        assert_eq!(
            command.get_variable("ovirt_vdscertificatevalidityinyears"),
            Some(&json!(5))
        );
        let time_to_check = command
            .get_variable("ovirt_time_to_check")
            .and_then(|v| v.as_i64())
            .unwrap();
        assert!(time_to_check >= (before + chrono::Duration::days(7)).timestamp());

        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            command.log_file_path(now),
            Some(PathBuf::from(
                "/var/log/ovirt-engine/host-deploy/\
                 ovirt-host-mgmt-ansible-host1.example.com-corr-1-20260102030405.log"
            ))
        );
    }

    #[test(tokio::test)]
    async fn update_failure() {
        let executor = FakeExecutor::new(PlaybookReturnCode::BadInput, "");
        let manager = HostUpgradeManager::new(
            executor.clone(),
            HostUpgradeConfig::default(),
            Arc::new(NoopAuditSink),
        );
        let err = manager
            .update(&host(HostType::Node), &UpgradeContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HostUpgradeError::UpdateFailed { .. }));
        assert_eq!(
            executor.commands()[0].get_variable("host_deploy_vnc_restart_services"),
            Some(&json!(false))
        );
    }

    #[test]
    fn expiration_cutoff() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            allowed_expiration_cutoff(now, 7),
            Utc.with_ymd_and_hms(2026, 1, 9, 3, 4, 5).unwrap()
        );
        assert_eq!(
            allowed_expiration_cutoff(DateTime::<Utc>::MAX_UTC, 1),
            DateTime::<Utc>::MAX_UTC
        );
    }

    #[test]
    fn host_types_exclude_vintage_nodes() {
        let types = HostUpgradeManager::<BrokenExecutor>::host_types();
        assert!(types.contains(&HostType::Vds));
        assert!(!types.contains(&HostType::VintageNode));
    }
}
