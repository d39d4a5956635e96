use decoyd::config::types::ControlConfig;
use decoyd::control::handler::{dispatch, ControlState};
use decoyd::control::protocol::ControlCommand;

fn cfg() -> ControlConfig {
    ControlConfig {
        listen: "127.0.0.1:0".to_string(),
        password: "correct-horse".to_string(),
        auth_methods: vec!["HASHEDPASSWORD".to_string()],
        version: "0.4.8.9".to_string(),
        cookie_file: None,
        audit_log_path: None,
    }
}

#[test]
fn wrong_password_yields_515() {
    let mut state = ControlState::new();
    let d = dispatch(&mut state, &cfg(), "AUTHENTICATE \"wrong\"");
    assert_eq!(d.reply, "515 Authentication failed\r\n");
    assert_eq!(d.command, Some(ControlCommand::Authenticate));
    assert_eq!(d.auth, Some(false));
    assert!(!d.close);
}

#[test]
fn correct_password_yields_250_and_sticks() {
    let cfg = cfg();
    let mut state = ControlState::new();
    let ok = dispatch(&mut state, &cfg, "AUTHENTICATE \"correct-horse\"");
    assert_eq!(ok.reply, "250 OK\r\n");
    assert!(state.is_authenticated());

    let again = dispatch(&mut state, &cfg, "AUTHENTICATE \"wrong\"");
    assert_eq!(again.reply, "515 Authentication failed\r\n");
    assert!(state.is_authenticated(), "failure must not revoke success");

    let repeat = dispatch(&mut state, &cfg, "authenticate \"correct-horse\"");
    assert_eq!(repeat.reply, "250 OK\r\n");
    assert!(state.is_authenticated());
}

#[test]
fn password_is_case_sensitive() {
    let mut state = ControlState::new();
    let d = dispatch(&mut state, &cfg(), "AUTHENTICATE \"CORRECT-HORSE\"");
    assert_eq!(d.auth, Some(false));
}

#[test]
fn commands_answered_without_authentication() {
    let cfg = cfg();
    let mut state = ControlState::new();
    assert!(dispatch(&mut state, &cfg, "PROTOCOLINFO 1")
        .reply
        .starts_with("250-PROTOCOLINFO 1\r\n"));
    assert_eq!(dispatch(&mut state, &cfg, "GETCONF SocksPort").reply, "250 OK\r\n");
    assert_eq!(dispatch(&mut state, &cfg, "SETCONF SocksPort=0").reply, "250 OK\r\n");
    assert_eq!(dispatch(&mut state, &cfg, "SIGNAL RELOAD").reply, "250 OK\r\n");
    assert!(!state.is_authenticated());
}

#[test]
fn protocolinfo_exact_bytes() {
    let mut state = ControlState::new();
    let d = dispatch(&mut state, &cfg(), "protocolinfo");
    assert_eq!(
        d.reply,
        "250-PROTOCOLINFO 1\r\n250-AUTH METHODS=HASHEDPASSWORD\r\n250-VERSION Tor=\"0.4.8.9\"\r\n250 OK\r\n"
    );
}

#[test]
fn getinfo_version_variants() {
    let cfg = cfg();
    let mut state = ControlState::new();
    for line in ["GETINFO version", "getinfo VERSION", "GETINFO net/listeners version"] {
        assert_eq!(
            dispatch(&mut state, &cfg, line).reply,
            "250-version=0.4.8.9\r\n250 OK\r\n",
            "line {line:?}"
        );
    }
    assert_eq!(
        dispatch(&mut state, &cfg, "GETINFO version/current").reply,
        "552 Unrecognized command\r\n"
    );
}

#[test]
fn unrecognized_is_exactly_552() {
    let mut state = ControlState::new();
    for line in ["", "HELP", "USEFEATURE VERBOSE_NAMES", "EXTENDCIRCUIT 0"] {
        let d = dispatch(&mut state, &cfg(), line);
        assert_eq!(d.reply, "552 Unrecognized command\r\n");
        assert_eq!(d.command, None);
        assert!(!d.close);
    }
}

#[test]
fn only_quit_closes() {
    let cfg = cfg();
    for cmd in ControlCommand::ALL {
        let mut state = ControlState::new();
        let d = dispatch(&mut state, &cfg, cmd.keyword());
        assert_eq!(d.close, cmd == ControlCommand::Quit, "{:?}", cmd);
    }
}
