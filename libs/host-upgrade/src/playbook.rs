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
//! Playbook invocations.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Environment variable selecting the stdout callback plugin.
const STDOUT_CALLBACK_ENV: &str = "ANSIBLE_STDOUT_CALLBACK";
/// Environment variable selecting the log file.
const LOG_PATH_ENV: &str = "ANSIBLE_LOG_PATH";

/// Verbosity of a playbook run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// No extra output.
    Level0,
    /// `-v`
    #[default]
    Level1,
    /// `-vv`
    Level2,
    /// `-vvv`
    Level3,
    /// `-vvvv`
    Level4,
}

impl Verbosity {
    fn flag(self) -> Option<&'static str> {
        match self {
            Verbosity::Level0 => None,
            Verbosity::Level1 => Some("-v"),
            Verbosity::Level2 => Some("-vv"),
            Verbosity::Level3 => Some("-vvv"),
            Verbosity::Level4 => Some("-vvvv"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LogFile {
    directory: PathBuf,
    prefix: String,
    name: String,
    suffix: String,
}

/// A playbook invocation, built step by step.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybookCommand {
    playbook: PathBuf,
    hostnames: Vec<String>,
    check_mode: bool,
    verbosity: Verbosity,
    stdout_callback: Option<String>,
    enable_logging: bool,
    log_file: Option<LogFile>,
    variables: BTreeMap<String, Value>,
}

impl PlaybookCommand {
    /// Creates a command running `playbook`.
    pub fn new(playbook: impl Into<PathBuf>) -> Self {
        Self {
            playbook: playbook.into(),
            hostnames: Vec::new(),
            check_mode: false,
            verbosity: Verbosity::default(),
            stdout_callback: None,
            enable_logging: true,
            log_file: None,
            variables: BTreeMap::new(),
        }
    }

    /// Sets the hosts to run against.
    pub fn hostnames<I, S>(mut self, hostnames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hostnames = hostnames.into_iter().map(Into::into).collect();
        self
    }

    /// Runs without changing anything on the hosts.
    pub fn check_mode(mut self, check_mode: bool) -> Self {
        self.check_mode = check_mode;
        self
    }

    /// Sets the verbosity.
    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Selects the plugin that renders stdout.
    pub fn stdout_callback(mut self, plugin: impl Into<String>) -> Self {
        self.stdout_callback = Some(plugin.into());
        self
    }

    /// Enables or disables writing a log file.
    pub fn enable_logging(mut self, enable: bool) -> Self {
        self.enable_logging = enable;
        self
    }

    /// Writes the log to `<directory>/<prefix>-<name>-<suffix>-<timestamp>.log`.
    pub fn log_file(
        mut self,
        directory: impl Into<PathBuf>,
        prefix: impl Into<String>,
        name: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Self {
        self.log_file = Some(LogFile {
            directory: directory.into(),
            prefix: prefix.into(),
            name: name.into(),
            suffix: suffix.into(),
        });
        self
    }

    /// Adds an extra variable.
    pub fn variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// The playbook to run.
    pub fn playbook(&self) -> &Path {
        &self.playbook
    }

    /// Returns true if the command runs in check mode.
    pub fn is_check_mode(&self) -> bool {
        self.check_mode
    }

    /// Looks up an extra variable.
    pub fn get_variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Path of the log file for a run started at `now`, if logging is enabled.
    pub fn log_file_path(&self, now: DateTime<Utc>) -> Option<PathBuf> {
        if !self.enable_logging {
            return None;
        }
        let log = self.log_file.as_ref()?;
        let timestamp = now.format("%Y%m%d%H%M%S");
        Some(log.directory.join(format!(
            "{}-{}-{}-{timestamp}.log",
            log.prefix, log.name, log.suffix
        )))
    }

    /// Command line arguments for `ansible-playbook`.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if !self.hostnames.is_empty() {
            // A trailing comma makes the inventory an inline host list.
            args.push("--inventory".to_string());
            args.push(format!("{},", self.hostnames.join(",")));
        }
        if self.check_mode {
            args.push("--check".to_string());
        }
        if let Some(flag) = self.verbosity.flag() {
            args.push(flag.to_string());
        }
        if !self.variables.is_empty() {
            args.push("--extra-vars".to_string());
            args.push(Value::Object(self.variables.clone().into_iter().collect()).to_string());
        }
        args.push(self.playbook.display().to_string());
        args
    }

    /// Environment variables for a run started at `now`.
    pub fn env(&self, now: DateTime<Utc>) -> Vec<(&'static str, String)> {
        let mut env = Vec::new();
        if let Some(plugin) = &self.stdout_callback {
            env.push((STDOUT_CALLBACK_ENV, plugin.clone()));
        }
        if let Some(path) = self.log_file_path(now) {
            env.push((LOG_PATH_ENV, path.display().to_string()));
        }
        env
    }
}

/// Outcome class of a playbook run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybookReturnCode {
    /// The run succeeded.
    Ok,
    /// A task failed or a host was unreachable.
    Fail,
    /// The playbook or the options were invalid.
    BadInput,
    /// Anything else, including termination by a signal.
    UnexpectedError,
}

impl PlaybookReturnCode {
    /// Classifies a process exit code.
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => PlaybookReturnCode::Ok,
            Some(1..=3) => PlaybookReturnCode::Fail,
            Some(4 | 5) => PlaybookReturnCode::BadInput,
            _ => PlaybookReturnCode::UnexpectedError,
        }
    }
}

/// Result of a playbook run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybookOutput {
    /// Outcome class.
    pub code: PlaybookReturnCode,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
}

/// Runs playbooks.
#[async_trait]
pub trait PlaybookExecutor: Send + Sync {
    /// Runs `command` to completion.
    ///
    /// An `Err` means the run could not be started or observed. A finished run
    /// is always `Ok`, whatever its return code.
    async fn run(&self, command: &PlaybookCommand) -> std::io::Result<PlaybookOutput>;
}

#[async_trait]
impl<E: PlaybookExecutor + ?Sized> PlaybookExecutor for std::sync::Arc<E> {
    async fn run(&self, command: &PlaybookCommand) -> std::io::Result<PlaybookOutput> {
        (**self).run(command).await
    }
}

/// Runs playbooks as `ansible-playbook` subprocesses.
#[derive(Debug, Clone)]
pub struct ProcessPlaybookExecutor {
    binary: PathBuf,
}

impl Default for ProcessPlaybookExecutor {
    fn default() -> Self {
        Self::new("ansible-playbook")
    }
}

impl ProcessPlaybookExecutor {
    /// Creates an executor invoking `binary`.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl PlaybookExecutor for ProcessPlaybookExecutor {
    async fn run(&self, command: &PlaybookCommand) -> std::io::Result<PlaybookOutput> {
        let args = command.to_args();
        tracing::debug!(binary = %self.binary.display(), ?args, "Running playbook");

        let output = tokio::process::Command::new(&self.binary)
            .args(&args)
            .envs(command.env(Utc::now()))
            .kill_on_drop(true)
            .output()
            .await?;

        Ok(PlaybookOutput {
            code: PlaybookReturnCode::from_exit_code(output.status.code()),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn renders_check_mode_arguments() {
        let command = PlaybookCommand::new("host-upgrade.yml")
            .hostnames(["host1.example.com"])
            .check_mode(true)
            .verbosity(Verbosity::Level0)
            .stdout_callback("hostupgradeplugin")
            .enable_logging(false);

        assert_eq!(
            command.to_args(),
            vec![
                "--inventory",
                "host1.example.com,",
                "--check",
                "host-upgrade.yml"
            ]
        );
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            command.env(now),
            vec![(STDOUT_CALLBACK_ENV, "hostupgradeplugin".to_string())]
        );
    }

    #[test]
    fn renders_variables_as_one_json_document() {
        let command = PlaybookCommand::new("host-upgrade.yml")
            .variable("flag", true)
            .variable("count", 7)
            .variable("name", "x");
        let args = command.to_args();
        assert_eq!(args[0], "-v");
        assert_eq!(args[1], "--extra-vars");
        let vars: Value = serde_json::from_str(&args[2]).unwrap();
        assert_eq!(vars, serde_json::json!({"flag": true, "count": 7, "name": "x"}));
    }

    #[test]
    fn log_file_path_only_when_enabled() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let command = PlaybookCommand::new("p.yml").log_file("/var/log/deploy", "mgmt", "h1", "c0ffee");
        assert_eq!(
            command.log_file_path(now),
            Some(PathBuf::from("/var/log/deploy/mgmt-h1-c0ffee-20260102030405.log"))
        );
        assert_eq!(command.clone().enable_logging(false).log_file_path(now), None);
    }

    #[test]
    fn classifies_exit_codes() {
        assert_eq!(PlaybookReturnCode::from_exit_code(Some(0)), PlaybookReturnCode::Ok);
        assert_eq!(PlaybookReturnCode::from_exit_code(Some(2)), PlaybookReturnCode::Fail);
        assert_eq!(PlaybookReturnCode::from_exit_code(Some(4)), PlaybookReturnCode::BadInput);
        assert_eq!(
            PlaybookReturnCode::from_exit_code(Some(250)),
            PlaybookReturnCode::UnexpectedError
        );
        assert_eq!(
            PlaybookReturnCode::from_exit_code(None),
            PlaybookReturnCode::UnexpectedError
        );
    }
}
