//! Multi-node election tests over real HTTP transports.
//!
//! Each test boots a full cluster on ephemeral localhost ports and watches
//! the nodes' reported status while elections run. The core safety check is
//! the same in every case: no term may ever be claimed by two leaders.

use std::collections::HashMap;
use std::collections::HashSet;
use std::net::TcpListener;
use std::sync::Arc;

use raft_elect::Node;
use raft_elect::NodeBuilder;
use raft_elect::NodeMeta;
use raft_elect::NodeState;
use raft_elect::NodeStatus;
use raft_elect::RaftNodeConfig;
use raft_elect::RaftTypeConfig;
use tokio::sync::watch;
use tokio::time::sleep;
use tokio::time::Duration;
use tokio::time::Instant;

fn free_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().expect("local addr").to_string()
}

struct Cluster {
    nodes: Vec<Arc<Node<RaftTypeConfig>>>,
    shutdown_tx: watch::Sender<()>,
    _tmp: tempfile::TempDir,
}

async fn start_cluster(size: usize) -> Cluster {
    let tmp = tempfile::tempdir().expect("tempdir");
    let members: Vec<NodeMeta> = (1..=size)
        .map(|i| NodeMeta {
            id: format!("n{}", i),
            address: free_address(),
        })
        .collect();
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    let mut nodes = Vec::with_capacity(size);
    for member in &members {
        let mut node_config = RaftNodeConfig::default();
        node_config.cluster.node_id = member.id.clone();
        node_config.cluster.listen_address = member.address.parse().expect("listen address");
        node_config.cluster.initial_cluster = members.clone();
        node_config.cluster.db_root_dir = tmp.path().to_path_buf();
        node_config.cluster.log_dir = tmp.path().join("logs");
        node_config.raft.election.election_timeout_min = 300;
        node_config.raft.election.election_timeout_max = 600;
        node_config.raft.heartbeat_interval_in_ms = 100;

        let node = NodeBuilder::init(node_config, shutdown_rx.clone())
            .build()
            .start_rpc_server()
            .ready()
            .expect("node should start");

        let engine = node.clone();
        tokio::spawn(async move { engine.run().await });
        nodes.push(node);
    }

    Cluster {
        nodes,
        shutdown_tx,
        _tmp: tmp,
    }
}

async fn sample(nodes: &[Arc<Node<RaftTypeConfig>>]) -> Vec<Option<NodeStatus>> {
    let mut statuses = Vec::with_capacity(nodes.len());
    for node in nodes {
        statuses.push(node.status().await.ok());
    }
    statuses
}

/// Folds one sample into the per-term leader ledger.
fn record_leaders(
    statuses: &[Option<NodeStatus>],
    leaders_by_term: &mut HashMap<u64, HashSet<String>>,
) {
    for status in statuses.iter().flatten() {
        if status.state == NodeState::Leader {
            leaders_by_term
                .entry(status.current_term)
                .or_default()
                .insert(status.node_id.clone());
        }
    }
}

fn assert_leader_exclusivity(leaders_by_term: &HashMap<u64, HashSet<String>>) {
    for (term, leaders) in leaders_by_term {
        assert!(
            leaders.len() <= 1,
            "term {} was claimed by more than one leader: {:?}",
            term,
            leaders
        );
    }
}

/// Polls until exactly one node reports LEADER and every node agrees on its
/// term. Returns the leader's index and term.
async fn wait_for_leader(
    nodes: &[Arc<Node<RaftTypeConfig>>],
    leaders_by_term: &mut HashMap<u64, HashSet<String>>,
    timeout: Duration,
) -> Option<(usize, u64)> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        let statuses = sample(nodes).await;
        record_leaders(&statuses, leaders_by_term);

        let leaders: Vec<(usize, u64)> = statuses
            .iter()
            .enumerate()
            .filter_map(|(i, status)| {
                status
                    .as_ref()
                    .filter(|s| s.state == NodeState::Leader)
                    .map(|s| (i, s.current_term))
            })
            .collect();

        if let [(leader_idx, leader_term)] = leaders[..] {
            let converged = statuses.iter().flatten().all(|s| s.current_term == leader_term);
            if converged {
                return Some((leader_idx, leader_term));
            }
        }

        sleep(Duration::from_millis(25)).await;
    }
    None
}

/// # Case 1: a 3-node cluster elects exactly one leader per term
///
/// ## Validation criterias:
/// 1. one node reaches LEADER and the others follow at its term
/// 2. across the whole observation window, no term is ever reported as
///    led by two different nodes
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cluster_election_case1() {
    let cluster = start_cluster(3).await;
    let mut leaders_by_term: HashMap<u64, HashSet<String>> = HashMap::new();

    let (_, leader_term) = wait_for_leader(&cluster.nodes, &mut leaders_by_term, Duration::from_secs(15))
        .await
        .expect("a leader should emerge");

    // Keep watching the converged cluster for a while.
    let settle_deadline = Instant::now() + Duration::from_secs(1);
    while Instant::now() < settle_deadline {
        let statuses = sample(&cluster.nodes).await;
        record_leaders(&statuses, &mut leaders_by_term);
        sleep(Duration::from_millis(25)).await;
    }

    assert_leader_exclusivity(&leaders_by_term);
    assert_eq!(
        leaders_by_term.get(&leader_term).map(|leaders| leaders.len()),
        Some(1)
    );

    cluster.shutdown_tx.send(()).expect("shutdown send");
}

/// # Case 2: stopping the leader triggers a failover; the old leader rejoins
///
/// ## Validation criterias:
/// 1. the stopped leader reports DOWN/is_stopped
/// 2. a survivor wins a later term
/// 3. the resumed node rejoins the cluster at (or beyond) the new term
/// 4. leader exclusivity per term holds across the whole run
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cluster_election_case2() {
    let cluster = start_cluster(3).await;
    let mut leaders_by_term: HashMap<u64, HashSet<String>> = HashMap::new();

    let (leader_idx, first_term) = wait_for_leader(&cluster.nodes, &mut leaders_by_term, Duration::from_secs(15))
        .await
        .expect("a leader should emerge");

    cluster.nodes[leader_idx].stop().await.expect("stop should ack");
    let stopped = cluster.nodes[leader_idx].status().await.expect("status");
    assert_eq!(stopped.state, NodeState::Down);
    assert!(stopped.is_stopped);

    // The survivors notice the silence and elect a replacement.
    let deadline = Instant::now() + Duration::from_secs(15);
    let mut failover = None;
    while Instant::now() < deadline {
        let statuses = sample(&cluster.nodes).await;
        record_leaders(&statuses, &mut leaders_by_term);

        failover = statuses.iter().enumerate().find_map(|(i, status)| {
            status
                .as_ref()
                .filter(|s| i != leader_idx && s.state == NodeState::Leader && s.current_term > first_term)
                .map(|s| s.current_term)
        });
        if failover.is_some() {
            break;
        }
        sleep(Duration::from_millis(25)).await;
    }
    let new_term = failover.expect("a replacement leader should emerge");

    cluster.nodes[leader_idx].resume().await.expect("resume should ack");

    // The revived node catches up with the cluster's term.
    let deadline = Instant::now() + Duration::from_secs(15);
    let mut rejoined = false;
    while Instant::now() < deadline {
        let statuses = sample(&cluster.nodes).await;
        record_leaders(&statuses, &mut leaders_by_term);

        if let Some(status) = &statuses[leader_idx] {
            if !status.is_stopped && status.current_term >= new_term {
                rejoined = true;
                break;
            }
        }
        sleep(Duration::from_millis(25)).await;
    }
    assert!(rejoined, "the stopped node should rejoin the cluster");

    assert_leader_exclusivity(&leaders_by_term);

    cluster.shutdown_tx.send(()).expect("shutdown send");
}
