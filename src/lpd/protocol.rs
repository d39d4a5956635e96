//! Wire vocabulary of the line-printer decoy and its reply formats.
//!
//! Replies end in a bare `\n`, like the spooler being imitated.

use crate::config::types::ServerIdentity;

/// "Receive a printer job", also used by probes as a status query.
pub const CMD_RECEIVE_JOB: u8 = 0x02;
/// "Send queue state".
pub const CMD_QUEUE_STATE: u8 = 0x03;

/// Line that turns a 0x02 exchange into a status query.
pub const STATUS_QUERY: &str = "print_queue";

/// Queue names advertised on every queue-state request.
pub const ADVERTISED_QUEUES: [&str; 3] = ["queue1", "queue2", "queue3"];

/// Recognized command bytes. Anything else is ignored without a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintCommand {
    ReceiveJob,
    QueueState,
}

impl PrintCommand {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            CMD_RECEIVE_JOB => Some(Self::ReceiveJob),
            CMD_QUEUE_STATE => Some(Self::QueueState),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Self::ReceiveJob => CMD_RECEIVE_JOB,
            Self::QueueState => CMD_QUEUE_STATE,
        }
    }

    /// Label used in logs and audit records.
    pub fn label(self) -> &'static str {
        match self {
            Self::ReceiveJob => "receive_job",
            Self::QueueState => "queue_state",
        }
    }
}

/// Fixed refusal sent for a `print_queue` status query.
pub fn status_denied(identity: &ServerIdentity) -> String {
    format!(
        "{} [@Boyk]: Print-services are not available to your host (aF2qXkQ2m).\n",
        identity.server_name
    )
}

pub fn job_received(identity: &ServerIdentity, queue: &str) -> String {
    format!(
        "{} [{}]: Print job for queue {} received\n",
        identity.server_name, identity.version, queue
    )
}

pub fn queue_list(identity: &ServerIdentity) -> String {
    format!(
        "{} [{}]: Available queues: {}\n",
        identity.server_name,
        identity.version,
        ADVERTISED_QUEUES.join(", ")
    )
}

pub fn banner(identity: &ServerIdentity) -> String {
    format!("{}\n", identity.banner)
}
