use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "fattree-sdn-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_file(dir: &PathBuf, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write temp file");
    path
}

#[test]
fn pingall_succeeds_every_round() {
    let output = Command::new(env!("CARGO_BIN_EXE_sp_routing"))
        .args(["--k", "4", "--rounds", "2"])
        .output()
        .expect("run sp_routing");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let rounds: Vec<&str> = stdout
        .lines()
        .filter(|line| line.starts_with("pingall "))
        .collect();
    assert_eq!(rounds.len(), 2, "stdout: {stdout}");
    assert!(rounds[0].starts_with("pingall round=1 pairs=240 ok=240 failed=0"));
    assert!(rounds[1].starts_with("pingall round=2 pairs=240 ok=240 failed=0"));
    assert!(rounds[1].ends_with("learned_hosts=16"));
}

#[test]
fn replays_events_and_prints_directives() {
    let dir = unique_temp_dir("sp-routing-replay");
    let events = write_file(
        &dir,
        "events.json",
        r#"
[
    { "kind": "switch_connected", "dpid": 20000, "ports": [1, 2, 3, 4] },
    { "kind": "switch_connected", "dpid": 10000, "ports": [1, 2, 3, 4] },
    { "kind": "switch_connected", "dpid": 20100, "ports": [1, 2, 3, 4] },
    {
        "kind": "topology_rebuilt",
        "switches": [20000, 10000, 20100],
        "links": [
            { "src": 20000, "src_port": 1, "dst": 10000 },
            { "src": 10000, "src_port": 1, "dst": 20000 },
            { "src": 10000, "src_port": 2, "dst": 20100 },
            { "src": 20100, "src_port": 1, "dst": 10000 }
        ]
    },
    {
        "kind": "packet_arrived",
        "dpid": 20000,
        "in_port": 3,
        "buffer": 7,
        "frame": { "kind": "ipv4", "src": "10.0.0.2", "dst": "10.1.0.2" }
    }
]
        "#,
    );

    let output = Command::new(env!("CARGO_BIN_EXE_sp_routing"))
        .args(["--events", events.to_str().unwrap()])
        .output()
        .expect("run sp_routing");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let v: Value = serde_json::from_slice(&output.stdout).expect("parse directives");
    let out = v.as_array().expect("directive array");
    // 3 条 table-miss 规则 + 路径规则 + packet-out
    assert_eq!(out.len(), 5);
    assert!(out[..3].iter().all(|d| d["kind"] == "install_rule"));

    assert_eq!(out[3]["kind"], "install_rule");
    assert_eq!(out[3]["dpid"], 20000);
    assert_eq!(out[3]["priority"], 10);

    assert_eq!(out[4]["kind"], "packet_out");
    assert_eq!(out[4]["dpid"], 20000);
    assert_eq!(out[4]["buffer"], 7);
    assert_eq!(out[4]["ports"], serde_json::json!([1]));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn malformed_events_file_fails() {
    let dir = unique_temp_dir("sp-routing-bad");
    let events = write_file(&dir, "events.json", r#"[ { "kind": "nope" } ]"#);
    let output = Command::new(env!("CARGO_BIN_EXE_sp_routing"))
        .args(["--events", events.to_str().unwrap()])
        .output()
        .expect("run sp_routing");
    assert!(!output.status.success());
    fs::remove_dir_all(&dir).ok();
}

const TIMED_EVENTS: &str = r#"
[
    {
        "at_ms": 20,
        "kind": "packet_arrived",
        "dpid": 20000,
        "in_port": 3,
        "buffer": 9,
        "frame": { "kind": "ipv4", "src": "10.0.0.2", "dst": "10.1.0.2" }
    },
    {
        "at_ms": 10,
        "kind": "topology_rebuilt",
        "switches": [20000, 10000, 20100],
        "links": [
            { "src": 20000, "src_port": 2, "dst": 10000 },
            { "src": 10000, "src_port": 1, "dst": 20000 },
            { "src": 10000, "src_port": 2, "dst": 20100 },
            { "src": 20100, "src_port": 1, "dst": 10000 }
        ]
    },
    { "kind": "switch_connected", "dpid": 20000, "ports": [1, 2, 3, 4] }
]
"#;

#[test]
fn replay_delivers_events_in_time_order() {
    let dir = unique_temp_dir("sp-routing-timed");
    let events = write_file(&dir, "events.json", TIMED_EVENTS);

    let output = Command::new(env!("CARGO_BIN_EXE_sp_routing"))
        .args(["--events", events.to_str().unwrap()])
        .output()
        .expect("run sp_routing");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let v: Value = serde_json::from_slice(&output.stdout).expect("parse directives");
    let out = v.as_array().expect("directive array");
    // 文件中排在最前的报文最后才投递，此时拓扑已就绪
    assert_eq!(out.len(), 3, "stdout: {v}");
    assert_eq!(out[0]["kind"], "install_rule");
    assert_eq!(out[1]["kind"], "install_rule");
    assert_eq!(out[1]["out"], serde_json::json!({ "physical": 2 }));
    assert_eq!(out[2]["kind"], "packet_out");
    assert_eq!(out[2]["buffer"], 9);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn replay_stops_at_until_ms() {
    let dir = unique_temp_dir("sp-routing-until");
    let events = write_file(&dir, "events.json", TIMED_EVENTS);

    let output = Command::new(env!("CARGO_BIN_EXE_sp_routing"))
        .args(["--events", events.to_str().unwrap(), "--until-ms", "15"])
        .output()
        .expect("run sp_routing");
    assert!(output.status.success());

    let v: Value = serde_json::from_slice(&output.stdout).expect("parse directives");
    let out = v.as_array().expect("directive array");
    // 只有 table-miss 规则，20ms 的报文没有被投递
    assert_eq!(out.len(), 1, "stdout: {v}");
    assert_eq!(out[0]["out"], "controller");

    fs::remove_dir_all(&dir).ok();
}
