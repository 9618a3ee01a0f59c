//! Audit trail of command authorization decisions

use crate::messages::InvocationContext;
use crate::rbac::manager::PermissionResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Outcome recorded for one check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allowed,
    Denied,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Allowed => f.write_str("allowed"),
            Decision::Denied => f.write_str("denied"),
        }
    }
}

/// One authorization decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub username: String,
    /// Channel the command was sent on
    pub channel_id: String,
    /// Resolved command name
    pub command: String,
    pub decision: Decision,
    /// Why access was denied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AuditLogEntry {
    pub fn new(ctx: &InvocationContext, command: &str, result: &PermissionResult) -> Self {
        let (decision, reason) = match result {
            PermissionResult::Allowed => (Decision::Allowed, None),
            PermissionResult::Denied(reason) => (Decision::Denied, Some(reason.clone())),
        };
        Self {
            timestamp: Utc::now(),
            user_id: ctx.user_id.clone(),
            username: ctx.username.clone(),
            channel_id: ctx.channel_id.clone(),
            command: command.to_string(),
            decision,
            reason,
        }
    }
}

/// Queues audit entries for the background writer
#[derive(Clone)]
pub struct AuditLogger {
    sender: mpsc::UnboundedSender<AuditLogEntry>,
}

impl AuditLogger {
    /// Create a logger and the receiver to hand to [`process_audit_logs`]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AuditLogEntry>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Record the decision for `command`
    pub fn log(&self, ctx: &InvocationContext, command: &str, result: &PermissionResult) {
        let entry = AuditLogEntry::new(ctx, command, result);
        debug!(
            "queueing audit entry: user={} command={} decision={}",
            entry.user_id, entry.command, entry.decision
        );
        if let Err(e) = self.sender.send(entry) {
            error!("audit writer has stopped, entry dropped: {}", e.0.command);
        }
    }
}

/// Write queued entries to the log until every logger is dropped
pub async fn process_audit_logs(mut receiver: mpsc::UnboundedReceiver<AuditLogEntry>) {
    while let Some(entry) = receiver.recv().await {
        match &entry.reason {
            None => info!(
                "Audit: {} user={} ({}) channel={} command=\"{}\" {}",
                entry.timestamp.to_rfc3339(),
                entry.username,
                entry.user_id,
                entry.channel_id,
                entry.command,
                entry.decision
            ),
            Some(reason) => info!(
                "Audit: {} user={} ({}) channel={} command=\"{}\" {} ({})",
                entry.timestamp.to_rfc3339(),
                entry.username,
                entry.user_id,
                entry.channel_id,
                entry.command,
                entry.decision,
                reason
            ),
        }
    }
}
