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
//! # Audit
//!
//! Events that are reported to the operator-facing audit log.
//!
//! Components publish an [AuditEvent] into an [AuditSink] and do not wait for
//! the outcome. Delivery problems are the sink's concern and never surface to
//! the component that emitted the event.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// An event for the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// The MAC address pool has no address left to hand out.
    MacPoolEmpty,
    /// Package updates are available for a host, with a summary of the packages.
    HostUpdatesAvailableWithPackages {
        /// Host identifier.
        host_id: Uuid,
        /// Host display name.
        host_name: String,
        /// Human readable, possibly truncated, list of packages.
        packages: String,
    },
}

impl AuditEvent {
    /// Stable name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AuditEvent::MacPoolEmpty => "MAC_POOL_EMPTY",
            AuditEvent::HostUpdatesAvailableWithPackages { .. } => {
                "HOST_UPDATES_ARE_AVAILABLE_WITH_PACKAGES"
            }
        }
    }
}

impl Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditEvent::MacPoolEmpty => write!(f, "No MAC addresses left in the MAC Address Pool"),
            AuditEvent::HostUpdatesAvailableWithPackages {
                host_name,
                packages,
                ..
            } => write!(f, "Host {host_name} has available updates: {packages}"),
        }
    }
}

/// Receiver of audit events.
///
/// Emitting is fire-and-forget: implementations must not block for long and
/// must swallow their own delivery errors.
pub trait AuditSink: Send + Sync {
    /// Publishes an event.
    fn emit(&self, event: AuditEvent);
}

/// Writes audit events to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        match &event {
            AuditEvent::MacPoolEmpty => {
                tracing::warn!(audit = event.kind(), "{event}");
            }
            AuditEvent::HostUpdatesAvailableWithPackages { host_id, .. } => {
                tracing::info!(audit = event.kind(), %host_id, "{event}");
            }
        }
    }
}

/// Forwards audit events into a channel, e.g. towards an audit log writer task.
#[derive(Debug, Clone)]
pub struct ChannelAuditSink {
    sender: mpsc::UnboundedSender<AuditEvent>,
}

impl ChannelAuditSink {
    /// Creates a sink together with the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AuditEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Creates a sink that sends into an existing channel.
    pub fn from_sender(sender: mpsc::UnboundedSender<AuditEvent>) -> Self {
        Self { sender }
    }
}

impl AuditSink for ChannelAuditSink {
    fn emit(&self, event: AuditEvent) {
        if let Err(e) = self.sender.send(event) {
            tracing::debug!(audit = e.0.kind(), "Audit receiver is gone, dropping event");
        }
    }
}

/// Discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn emit(&self, _event: AuditEvent) {}
}
