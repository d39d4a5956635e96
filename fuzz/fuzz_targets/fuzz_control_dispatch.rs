#![no_main]
use decoyd::config::types::ControlConfig;
use decoyd::control::handler::{dispatch, ControlState};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let cfg = ControlConfig {
        listen: "127.0.0.1:0".to_string(),
        password: "s3cret".to_string(),
        auth_methods: vec!["HASHEDPASSWORD".to_string()],
        version: "0.4.8.9".to_string(),
        cookie_file: None,
        audit_log_path: None,
    };
    let mut state = ControlState::new();
    let text = String::from_utf8_lossy(data);
    for line in text.split('\n') {
        let before = state.is_authenticated();
        let d = dispatch(&mut state, &cfg, line.trim());
        assert!(d.reply.ends_with("\r\n"));
        assert!(!before || state.is_authenticated());
    }
});
