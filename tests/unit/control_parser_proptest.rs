use decoyd::config::types::ControlConfig;
use decoyd::control::handler::{dispatch, ControlState};
use decoyd::control::protocol::ControlCommand;
use proptest::prelude::*;

fn cfg() -> ControlConfig {
    ControlConfig {
        listen: "127.0.0.1:0".to_string(),
        password: "pw".to_string(),
        auth_methods: vec!["HASHEDPASSWORD".to_string()],
        version: "0.4.8.9".to_string(),
        cookie_file: None,
        audit_log_path: None,
    }
}

fn starts_with_keyword(line: &str) -> bool {
    let upper = line.to_ascii_uppercase();
    ControlCommand::ALL
        .iter()
        .any(|c| upper.starts_with(c.keyword()))
}

proptest! {
    #[test]
    fn dispatch_never_panics(s in "\\PC{0,200}") {
        let mut state = ControlState::new();
        let _ = dispatch(&mut state, &cfg(), &s);
    }

    #[test]
    fn replies_are_crlf_terminated(s in "\\PC{0,120}") {
        let mut state = ControlState::new();
        let d = dispatch(&mut state, &cfg(), &s);
        prop_assert!(d.reply.ends_with("\r\n"));
        for line in d.reply.split_terminator("\r\n") {
            prop_assert!(line.len() >= 4, "short reply line {:?}", line);
            prop_assert!(line[..3].chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn non_keyword_lines_are_unrecognized(s in "[a-zA-Z0-9 ]{0,60}") {
        prop_assume!(!starts_with_keyword(&s));
        let mut state = ControlState::new();
        let d = dispatch(&mut state, &cfg(), &s);
        prop_assert_eq!(d.reply, "552 Unrecognized command\r\n");
        prop_assert!(!d.close);
    }

    #[test]
    fn authentication_is_monotonic(lines in prop::collection::vec(
        prop_oneof![
            Just("AUTHENTICATE \"pw\"".to_string()),
            Just("AUTHENTICATE \"nope\"".to_string()),
            Just("AUTHENTICATE".to_string()),
            "[A-Z]{0,12}( [a-z\"]{0,8})?",
        ],
        1..30,
    )) {
        let mut state = ControlState::new();
        let mut seen_success = false;
        for line in &lines {
            let d = dispatch(&mut state, &cfg(), line);
            if d.auth == Some(true) {
                seen_success = true;
            }
            prop_assert_eq!(state.is_authenticated(), seen_success);
        }
    }
}
