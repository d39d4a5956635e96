use crate::context::Protocol;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::SocketAddr;

/// One audit record. Serialized as a single JSON line tagged by `event_type`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type")]
pub enum AuditEvent {
    #[serde(rename = "connection.new")]
    ConnectionNew {
        timestamp: DateTime<Utc>,
        correlation_id: String,
        source: String,
        protocol: Protocol,
    },
    #[serde(rename = "connection.rejected")]
    ConnectionRejected {
        timestamp: DateTime<Utc>,
        source: String,
        protocol: Protocol,
        reason: String,
    },
    #[serde(rename = "command.received")]
    CommandReceived {
        timestamp: DateTime<Utc>,
        correlation_id: String,
        source: String,
        protocol: Protocol,
        command: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        argument: Option<String>,
    },
    #[serde(rename = "job.received")]
    JobReceived {
        timestamp: DateTime<Utc>,
        correlation_id: String,
        source: String,
        protocol: Protocol,
        queue: String,
        content: String,
    },
    #[serde(rename = "response.sent")]
    ResponseSent {
        timestamp: DateTime<Utc>,
        correlation_id: String,
        source: String,
        protocol: Protocol,
        response: String,
    },
    #[serde(rename = "auth.success")]
    AuthSuccess {
        timestamp: DateTime<Utc>,
        correlation_id: String,
        source: String,
        protocol: Protocol,
    },
    #[serde(rename = "auth.failure")]
    AuthFailure {
        timestamp: DateTime<Utc>,
        correlation_id: String,
        source: String,
        protocol: Protocol,
        attempt: String,
    },
    #[serde(rename = "session.error")]
    SessionError {
        timestamp: DateTime<Utc>,
        correlation_id: String,
        source: String,
        protocol: Protocol,
        error: String,
    },
    #[serde(rename = "connection.closed")]
    ConnectionClosed {
        timestamp: DateTime<Utc>,
        correlation_id: String,
        source: String,
        protocol: Protocol,
        reason: String,
        duration_ms: u64,
    },
}

impl AuditEvent {
    pub fn connection_new(source: &SocketAddr, protocol: Protocol, cid: &str) -> Self {
        Self::ConnectionNew {
            timestamp: Utc::now(),
            correlation_id: cid.to_string(),
            source: source.to_string(),
            protocol,
        }
    }

    pub fn connection_rejected(source: &SocketAddr, protocol: Protocol, reason: &str) -> Self {
        Self::ConnectionRejected {
            timestamp: Utc::now(),
            source: source.to_string(),
            protocol,
            reason: reason.to_string(),
        }
    }

    pub fn command_received(
        source: &SocketAddr,
        protocol: Protocol,
        cid: &str,
        command: &str,
        argument: Option<&str>,
    ) -> Self {
        Self::CommandReceived {
            timestamp: Utc::now(),
            correlation_id: cid.to_string(),
            source: source.to_string(),
            protocol,
            command: command.to_string(),
            argument: argument.map(str::to_string),
        }
    }

    pub fn job_received(
        source: &SocketAddr,
        protocol: Protocol,
        cid: &str,
        queue: &str,
        content: &str,
    ) -> Self {
        Self::JobReceived {
            timestamp: Utc::now(),
            correlation_id: cid.to_string(),
            source: source.to_string(),
            protocol,
            queue: queue.to_string(),
            content: content.to_string(),
        }
    }

    pub fn response_sent(source: &SocketAddr, protocol: Protocol, cid: &str, response: &str) -> Self {
        Self::ResponseSent {
            timestamp: Utc::now(),
            correlation_id: cid.to_string(),
            source: source.to_string(),
            protocol,
            response: response.to_string(),
        }
    }

    pub fn auth_success(source: &SocketAddr, protocol: Protocol, cid: &str) -> Self {
        Self::AuthSuccess {
            timestamp: Utc::now(),
            correlation_id: cid.to_string(),
            source: source.to_string(),
            protocol,
        }
    }

    pub fn auth_failure(source: &SocketAddr, protocol: Protocol, cid: &str, attempt: &str) -> Self {
        Self::AuthFailure {
            timestamp: Utc::now(),
            correlation_id: cid.to_string(),
            source: source.to_string(),
            protocol,
            attempt: attempt.to_string(),
        }
    }

    pub fn session_error(source: &SocketAddr, protocol: Protocol, cid: &str, error: &str) -> Self {
        Self::SessionError {
            timestamp: Utc::now(),
            correlation_id: cid.to_string(),
            source: source.to_string(),
            protocol,
            error: error.to_string(),
        }
    }

    pub fn connection_closed(
        source: &SocketAddr,
        protocol: Protocol,
        cid: &str,
        reason: &str,
        duration_ms: u64,
    ) -> Self {
        Self::ConnectionClosed {
            timestamp: Utc::now(),
            correlation_id: cid.to_string(),
            source: source.to_string(),
            protocol,
            reason: reason.to_string(),
            duration_ms,
        }
    }

    /// Return the `event_type` tag string for this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ConnectionNew { .. } => "connection.new",
            Self::ConnectionRejected { .. } => "connection.rejected",
            Self::CommandReceived { .. } => "command.received",
            Self::JobReceived { .. } => "job.received",
            Self::ResponseSent { .. } => "response.sent",
            Self::AuthSuccess { .. } => "auth.success",
            Self::AuthFailure { .. } => "auth.failure",
            Self::SessionError { .. } => "session.error",
            Self::ConnectionClosed { .. } => "connection.closed",
        }
    }

    /// Credential attempts and captured job payloads get a second chance at a
    /// channel slot when the writer falls behind.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Self::AuthSuccess { .. } | Self::AuthFailure { .. } | Self::JobReceived { .. }
        )
    }
}
