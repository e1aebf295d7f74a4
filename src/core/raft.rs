use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::sync::watch;
use tokio::time::sleep_until;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::raft_role::down_state::DownState;
use super::raft_role::follower_state::FollowerState;
use super::raft_role::send_response;
use super::RaftContext;
use super::RaftEvent;
use super::RaftRole;
use super::RoleEvent;
use crate::alias::EOF;
use crate::alias::SSOF;
use crate::alias::TROF;
use crate::ClusterView;
use crate::NetworkError;
use crate::NodeRecord;
use crate::NodeState;
use crate::NodeStatus;
use crate::RaftNodeConfig;
use crate::Result;
use crate::StateStorage;
use crate::TypeConfig;

/// The election engine: a single event loop owning the role state machine.
///
/// All state mutations happen on this loop, driven by three sources in
/// strict priority order: shutdown, the role timer, role transition events,
/// then inbound RPC/admin events. RPC handlers never touch state directly;
/// they submit a [`RaftEvent`] and await its oneshot responder.
pub struct Raft<T>
where T: TypeConfig
{
    pub node_id: String,
    pub role: RaftRole<T>,
    pub ctx: RaftContext<T>,

    // Network & admin events
    event_tx: mpsc::Sender<RaftEvent>,
    event_rx: mpsc::Receiver<RaftEvent>,

    // Role transitions
    role_tx: mpsc::UnboundedSender<RoleEvent>,
    role_rx: mpsc::UnboundedReceiver<RoleEvent>,

    // Shutdown signal
    shutdown_signal: watch::Receiver<()>,

    // For unit test
    #[cfg(test)]
    test_role_transition_listener: Vec<mpsc::UnboundedSender<NodeState>>,
}

pub struct SignalParams {
    pub(crate) role_tx: mpsc::UnboundedSender<RoleEvent>,
    pub(crate) role_rx: mpsc::UnboundedReceiver<RoleEvent>,
    pub(crate) event_tx: mpsc::Sender<RaftEvent>,
    pub(crate) event_rx: mpsc::Receiver<RaftEvent>,
    pub(crate) shutdown_signal: watch::Receiver<()>,
}

impl SignalParams {
    pub fn new(
        role_tx: mpsc::UnboundedSender<RoleEvent>,
        role_rx: mpsc::UnboundedReceiver<RoleEvent>,
        event_tx: mpsc::Sender<RaftEvent>,
        event_rx: mpsc::Receiver<RaftEvent>,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            role_tx,
            role_rx,
            event_tx,
            event_rx,
            shutdown_signal,
        }
    }
}

impl<T> Raft<T>
where T: TypeConfig
{
    /// Builds the engine from the restored durable record.
    ///
    /// Restart demotion: whatever role the record was saved under, the node
    /// boots as FOLLOWER, or as DOWN when `is_stopped` was set. Term and
    /// vote survive unchanged.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        node_id: String,
        record: &NodeRecord,
        state_storage: Arc<SSOF<T>>,
        transport: Arc<TROF<T>>,
        election_handler: EOF<T>,
        cluster: Arc<ClusterView>,
        signal_params: SignalParams,
        node_config: Arc<RaftNodeConfig>,
    ) -> Self {
        let role = if record.is_stopped {
            info!("[{}] restored with is_stopped = true, booting as DOWN", node_id);
            RaftRole::Down(DownState::new(node_id.clone(), node_config.clone(), record))
        } else {
            RaftRole::Follower(FollowerState::new(node_id.clone(), node_config.clone(), record))
        };

        let ctx = RaftContext {
            node_id: node_id.clone(),
            state_storage,
            transport,
            election_handler,
            cluster,
            settings: node_config,
        };

        Raft {
            node_id,
            role,
            ctx,

            event_tx: signal_params.event_tx,
            event_rx: signal_params.event_rx,

            role_tx: signal_params.role_tx,
            role_rx: signal_params.role_rx,

            shutdown_signal: signal_params.shutdown_signal,

            #[cfg(test)]
            test_role_transition_listener: Vec::new(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        info!("Node is running");

        if self.role.is_timer_expired() {
            self.role.reset_timer();
        }

        loop {
            // Note: next_deadline will be reset inside each role's tick
            let tick = sleep_until(self.role.next_deadline());

            tokio::select! {
                // Use biased to ensure branch order
                biased;
                // P0: shutdown received
                _ = self.shutdown_signal.changed() => {
                    info!("[Raft:{}] shutdown signal received.", self.node_id);
                    return Ok(());
                }
                // P1: Tick: broadcast heartbeats or start an election
                _ = tick => {
                    trace!("receive tick");

                    if let Err(e) = self.role.tick(&self.role_tx, &self.ctx).await {
                        error!("tick failed: {:?}", e);
                    }
                }

                // P2: Role events
                Some(role_event) = self.role_rx.recv() => {
                    debug!(%self.node_id, ?role_event, "receive role event");

                    if let Err(e) = self.handle_role_event(role_event).await {
                        error!(%self.node_id, ?e, "handle_role_event error");
                    }
                }

                // P3: Other events
                Some(raft_event) = self.event_rx.recv() => {
                    trace!(%self.node_id, ?raft_event, "receive raft event");

                    if let Err(e) = self.dispatch_raft_event(raft_event).await {
                        error!(%self.node_id, ?e, "handle_raft_event error");
                    }
                }
            }
        }
    }

    /// Admin and status events are engine concerns; everything else goes to
    /// the current role state.
    async fn dispatch_raft_event(
        &mut self,
        raft_event: RaftEvent,
    ) -> Result<()> {
        match raft_event {
            RaftEvent::AdminStop(sender) => self.handle_admin_stop(sender),
            RaftEvent::AdminResume(sender) => self.handle_admin_resume(sender),
            RaftEvent::QueryStatus(sender) => send_response(sender, self.node_status()),
            other => {
                self.role.handle_raft_event(other, &self.ctx, self.role_tx.clone()).await
            }
        }
    }

    /// Processes role transitions and engine-internal signals.
    pub async fn handle_role_event(
        &mut self,
        role_event: RoleEvent,
    ) -> Result<()> {
        match role_event {
            RoleEvent::BecomeCandidate => {
                if self.role.is_down() {
                    warn!("BecomeCandidate ignored: node is stopped");
                    return Ok(());
                }
                debug!("BecomeCandidate");
                self.role = self.role.become_candidate()?;

                #[cfg(test)]
                self.notify_role_transition();

                // The first election round opens immediately; the randomized
                // timer only paces the retries.
                if let Err(e) = self.role.tick(&self.role_tx, &self.ctx).await {
                    error!("election kickoff failed: {:?}", e);
                }
            }

            RoleEvent::ElectionWon { term } => {
                // The win is only valid if this node is still campaigning at
                // exactly that term.
                if !self.role.is_candidate() || self.role.current_term() != term {
                    debug!(
                        "stale ElectionWon for term {} ignored (current: {}, candidate: {})",
                        term,
                        self.role.current_term(),
                        self.role.is_candidate()
                    );
                    return Ok(());
                }

                let record = self.role.to_record(NodeState::Leader, false);
                self.ctx.state_storage().save_node_record(&record)?;

                self.role = self.role.become_leader()?;

                #[cfg(test)]
                self.notify_role_transition();
            }

            RoleEvent::StepDown { new_term } => {
                if self.role.is_down() {
                    warn!("StepDown ignored: node is stopped");
                    return Ok(());
                }
                debug!("StepDown, new_term: {:?}", new_term);

                if let Some(new_term) = new_term {
                    // The adopted term must be durable before it becomes
                    // visible anywhere; a failed save keeps the old term and
                    // the current role.
                    let mut record = self.role.to_record(NodeState::Follower, false);
                    if new_term > record.current_term {
                        record.current_term = new_term;
                        record.voted_for = None;
                    }
                    self.ctx.state_storage().save_node_record(&record)?;
                    self.role.update_term(new_term);
                }

                if !self.role.is_follower() {
                    self.role = self.role.become_follower()?;

                    #[cfg(test)]
                    self.notify_role_transition();
                }
            }

            RoleEvent::ReprocessEvent(raft_event) => {
                info!("Replay the RaftEvent: {:?}", &raft_event);
                self.event_tx.send(*raft_event).await.map_err(|e| {
                    let error_str = format!("{e:?}");
                    error!("Failed to send: {}", error_str);
                    NetworkError::SignalSendFailed(error_str)
                })?;
            }
        };

        Ok(())
    }

    fn handle_admin_stop(
        &mut self,
        sender: oneshot::Sender<Result<()>>,
    ) -> Result<()> {
        if self.role.is_down() {
            debug!("AdminStop: already stopped");
            return send_response(sender, Ok(()));
        }

        let record = self.role.to_record(NodeState::Down, true);
        if let Err(e) = self.ctx.state_storage().save_node_record(&record) {
            error!("persisting stop record failed: {:?}", e);
            return send_response(sender, Err(e));
        }

        self.role = self.role.become_down()?;
        info!("[{}] stopped by admin request", self.node_id);

        #[cfg(test)]
        self.notify_role_transition();

        send_response(sender, Ok(()))
    }

    fn handle_admin_resume(
        &mut self,
        sender: oneshot::Sender<Result<()>>,
    ) -> Result<()> {
        if !self.role.is_down() {
            debug!("AdminResume: not stopped");
            return send_response(sender, Ok(()));
        }

        let record = self.role.to_record(NodeState::Follower, false);
        if let Err(e) = self.ctx.state_storage().save_node_record(&record) {
            error!("persisting resume record failed: {:?}", e);
            return send_response(sender, Err(e));
        }

        self.role = self.role.become_follower()?;
        info!("[{}] resumed by admin request", self.node_id);

        #[cfg(test)]
        self.notify_role_transition();

        send_response(sender, Ok(()))
    }

    fn node_status(&self) -> NodeStatus {
        NodeStatus {
            node_id: self.node_id.clone(),
            state: self.role.node_state(),
            current_term: self.role.current_term(),
            voted_for: self.role.voted_for(),
            is_stopped: self.role.is_down(),
        }
    }

    /// Cloned event sender for the RPC surface.
    pub fn event_sender(&self) -> mpsc::Sender<RaftEvent> {
        self.event_tx.clone()
    }

    #[cfg(test)]
    pub fn register_role_transition_listener(
        &mut self,
        tx: mpsc::UnboundedSender<NodeState>,
    ) {
        self.test_role_transition_listener.push(tx);
    }

    #[cfg(test)]
    pub fn notify_role_transition(&self) {
        let new_state = self.role.node_state();
        for tx in &self.test_role_transition_listener {
            tx.send(new_state).expect("should succeed");
        }
    }
}

impl<T> Drop for Raft<T>
where T: TypeConfig
{
    fn drop(&mut self) {
        info!("Raft been dropped.");

        let record = self.role.to_record(self.role.node_state(), self.role.is_down());
        if let Err(e) = self.ctx.state_storage().save_node_record(&record) {
            error!(?e, "State storage persist node record failed.");
        }
    }
}
