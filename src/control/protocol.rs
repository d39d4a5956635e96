//! Keywords and reply formats of the control-port decoy.
//!
//! Every reply line has the form `<status><sep><text>\r\n`, where `sep` is
//! `-` on continuation lines and a space on the final line.

use crate::config::types::ControlConfig;

pub const STATUS_OK: u16 = 250;
pub const STATUS_AUTH_FAILED: u16 = 515;
pub const STATUS_UNRECOGNIZED: u16 = 552;

const CRLF: &str = "\r\n";

/// The closed set of keywords this decoy answers.
///
/// Recognition is by prefix of the upper-cased line, tried in declaration
/// order, so `getinfo version` and `GETINFOversion` both map to [`GetInfo`].
///
/// [`GetInfo`]: ControlCommand::GetInfo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Authenticate,
    ProtocolInfo,
    GetInfo,
    Signal,
    MapAddress,
    GetConf,
    SetConf,
    Quit,
}

impl ControlCommand {
    pub const ALL: [ControlCommand; 8] = [
        ControlCommand::Authenticate,
        ControlCommand::ProtocolInfo,
        ControlCommand::GetInfo,
        ControlCommand::Signal,
        ControlCommand::MapAddress,
        ControlCommand::GetConf,
        ControlCommand::SetConf,
        ControlCommand::Quit,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            ControlCommand::Authenticate => "AUTHENTICATE",
            ControlCommand::ProtocolInfo => "PROTOCOLINFO",
            ControlCommand::GetInfo => "GETINFO",
            ControlCommand::Signal => "SIGNAL",
            ControlCommand::MapAddress => "MAPADDRESS",
            ControlCommand::GetConf => "GETCONF",
            ControlCommand::SetConf => "SETCONF",
            ControlCommand::Quit => "QUIT",
        }
    }

    /// Match a trimmed command line against the keyword set.
    pub fn recognize(line: &str) -> Option<Self> {
        let upper = line.to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|cmd| upper.starts_with(cmd.keyword()))
    }
}

/// Format one reply line.
fn reply_line(out: &mut String, status: u16, last: bool, text: &str) {
    out.push_str(&status.to_string());
    out.push(if last { ' ' } else { '-' });
    out.push_str(text);
    out.push_str(CRLF);
}

/// Format a reply made of `lines`, the last one closing the reply.
pub fn multi_line(status: u16, lines: &[&str]) -> String {
    let mut out = String::new();
    for (i, text) in lines.iter().enumerate() {
        reply_line(&mut out, status, i + 1 == lines.len(), text);
    }
    out
}

pub fn ok() -> String {
    multi_line(STATUS_OK, &["OK"])
}

pub fn auth_failed() -> String {
    multi_line(STATUS_AUTH_FAILED, &["Authentication failed"])
}

pub fn unrecognized() -> String {
    multi_line(STATUS_UNRECOGNIZED, &["Unrecognized command"])
}

/// PROTOCOLINFO block, byte-for-byte what a real control port sends.
pub fn protocol_info(cfg: &ControlConfig) -> String {
    let mut auth = format!("AUTH METHODS={}", cfg.auth_methods.join(","));
    if let Some(ref cookie) = cfg.cookie_file {
        auth.push_str(&format!(" COOKIEFILE=\"{}\"", cookie));
    }
    let version = format!("VERSION Tor=\"{}\"", cfg.version);
    multi_line(STATUS_OK, &["PROTOCOLINFO 1", &auth, &version, "OK"])
}

pub fn version_info(cfg: &ControlConfig) -> String {
    let line = format!("version={}", cfg.version);
    multi_line(STATUS_OK, &[&line, "OK"])
}
