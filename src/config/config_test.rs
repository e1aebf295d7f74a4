use std::io::Write;

use super::*;

/// # Case 1: default configuration passes validation
///
/// ## Validation criterias:
/// 1. `RaftNodeConfig::default()` validates successfully
/// 2. default cluster contains the node itself
#[test]
fn test_validate_case1() {
    let settings = RaftNodeConfig::default();
    assert!(settings.validate().is_ok());
    assert!(settings
        .cluster
        .initial_cluster
        .iter()
        .any(|n| n.id == settings.cluster.node_id));
}

/// # Case 2: election timeout window must be a non-empty range
///
/// ## Validation criterias:
/// 1. min == max is rejected
/// 2. min > max is rejected
#[test]
fn test_validate_case2() {
    let mut settings = RaftNodeConfig::default();
    settings.raft.election.election_timeout_min = 800;
    settings.raft.election.election_timeout_max = 800;
    assert!(settings.validate().is_err());

    settings.raft.election.election_timeout_max = 700;
    assert!(settings.validate().is_err());
}

/// # Case 3: heartbeat interval must stay below the election timeout minimum
#[test]
fn test_validate_case3() {
    let mut settings = RaftNodeConfig::default();
    settings.raft.heartbeat_interval_in_ms = settings.raft.election.election_timeout_min;
    assert!(settings.validate().is_err());
}

/// # Case 4: node must be listed in its own initial cluster
#[test]
fn test_validate_case4() {
    let mut settings = RaftNodeConfig::default();
    settings.cluster.node_id = "node-9".to_string();
    assert!(settings.validate().is_err());
}

/// # Case 5: duplicate member ids are rejected
#[test]
fn test_validate_case5() {
    let mut settings = RaftNodeConfig::default();
    settings.cluster.initial_cluster = vec![
        NodeMeta {
            id: "node-1".to_string(),
            address: "127.0.0.1:9081".to_string(),
        },
        NodeMeta {
            id: "node-1".to_string(),
            address: "127.0.0.1:9082".to_string(),
        },
    ];
    assert!(settings.validate().is_err());
}

/// # Case 6: load a node configuration from a TOML file
///
/// ## Validation criterias:
/// 1. file values override the defaults
/// 2. sections absent from the file keep their defaults
#[test]
fn test_load_case6() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("node.toml");
    let mut file = std::fs::File::create(&path).expect("create config file");
    writeln!(
        file,
        r#"
[cluster]
node_id = "n2"
listen_address = "127.0.0.1:9082"

[[cluster.initial_cluster]]
id = "n1"
address = "127.0.0.1:9081"

[[cluster.initial_cluster]]
id = "n2"
address = "127.0.0.1:9082"

[[cluster.initial_cluster]]
id = "n3"
address = "127.0.0.1:9083"

[raft.election]
election_timeout_min = 300
election_timeout_max = 600
"#
    )
    .expect("write config file");

    let settings = RaftNodeConfig::load(Some(path.to_str().expect("utf8 path"))).expect("load config");

    assert_eq!(settings.cluster.node_id, "n2");
    assert_eq!(settings.cluster.initial_cluster.len(), 3);
    assert_eq!(settings.raft.election.election_timeout_min, 300);
    assert_eq!(settings.raft.election.election_timeout_max, 600);
    // untouched section keeps defaults
    assert_eq!(settings.raft.heartbeat_interval_in_ms, 100);
}

/// # Case 7: missing config file falls back to defaults
#[test]
fn test_load_case7() {
    let settings = RaftNodeConfig::load(None).expect("load defaults");
    assert_eq!(settings.cluster.node_id, "node-1");
}
