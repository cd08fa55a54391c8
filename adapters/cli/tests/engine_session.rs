use std::{
    io::Write,
    process::{Command, Output, Stdio},
};

const SESSION: &str = concat!(
    "{\"MAX_ENERGY\": 1000, \"NEW_ENTITY_ENERGY_COST\": 1000, \"DROPOFF_COST\": 4000, ",
    "\"MAX_TURNS\": 400, \"EXTRACT_RATIO\": 4, \"MOVE_COST_RATIO\": 10}\n",
    "2 0\n",
    "0 2 2\n",
    "1 6 6\n",
    "8 8\n",
    "10 10 10 10 10 10 10 10\n",
    "10 10 10 10 10 10 10 10\n",
    "10 10 10 10 10 10 10 10\n",
    "10 10 10 10 10 10 10 10\n",
    "10 10 10 10 10 10 10 10\n",
    "10 10 10 10 10 10 10 10\n",
    "10 10 10 10 10 10 10 10\n",
    "10 10 10 10 10 10 10 10\n",
    "1\n0 0 0 5000\n1 0 0 5000\n0\n",
    "2\n0 0 0 4000\n1 0 0 5000\n0\n",
);

fn run_bot(args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_harvester"))
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("bot starts");
    // The bot may exit before reading everything, which closes the pipe.
    let _ = child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(stdin.as_bytes());
    child.wait_with_output().expect("bot exits")
}

#[test]
fn plays_a_scripted_session_until_the_engine_hangs_up() {
    let output = run_bot(&["--seed", "7", "--log-level", "error"], SESSION);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "Vyl_harvester\ng\ng\n");
}

#[test]
fn announces_the_configured_name() {
    let output = run_bot(&["--name", "Tester", "--seed", "1", "--log-level", "error"], SESSION);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().next(), Some("Tester"));
}

#[test]
fn unreadable_config_fails_before_the_handshake() {
    let output = run_bot(&["--config", "/nonexistent/harvester.toml"], SESSION);

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("harvester.toml"));
}

#[test]
fn truncated_handshake_is_reported() {
    let output = run_bot(&["--log-level", "error"], "{}\n2 0\n0 2 2\n");

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("handshake"));
}
