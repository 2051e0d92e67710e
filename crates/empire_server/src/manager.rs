//! Session scheduling.
//!
//! Every session runs on its own tokio task and owns its [`GameSession`]
//! outright. Callers talk to it through a [`SessionHandle`]: commands go in
//! over an mpsc channel with a oneshot reply, committed cycles come out on a
//! broadcast channel. Sessions share nothing, so they advance in parallel on
//! the multi-threaded runtime while each one processes a single command or
//! cycle at a time.

use std::collections::BTreeMap;
use std::time::Duration;

use empire_core::action::{Action, RejectedAction};
use empire_core::canonical::StateChecksum;
use empire_core::error::GameError;
use empire_core::ids::PlayerId;
use empire_core::notification::Notification;
use empire_core::scenario::Scenario;
use empire_core::simulation::{CycleReport, Simulation};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::session::{GameSession, SessionStatus, Submission};
use crate::SessionId;

/// Published after every cycle boundary.
#[derive(Debug, Clone, Serialize)]
pub enum SessionEvent {
    /// A cycle was committed.
    CycleCompleted {
        /// Session.
        session: SessionId,
        /// Cycle that was processed.
        cycle: u64,
        /// Checksum of the committed state.
        checksum: StateChecksum,
        /// Rejected actions; the transport forwards each to its submitter.
        rejected: Vec<RejectedAction>,
        /// Everything that happened during the cycle.
        notifications: Vec<Notification>,
        /// Whether the game ended with this cycle.
        game_over: bool,
    },
    /// Turn processing hit an invariant violation; the game is unavailable.
    Aborted {
        /// Session.
        session: SessionId,
        /// Cycle that failed.
        cycle: u64,
        /// What was inconsistent.
        message: String,
    },
}

impl SessionEvent {
    fn completed(session: SessionId, report: &CycleReport) -> Self {
        Self::CycleCompleted {
            session,
            cycle: report.cycle,
            checksum: report.checksum.clone(),
            rejected: report.rejected.clone(),
            notifications: report.notifications.clone(),
            game_over: report.game_over,
        }
    }
}

#[derive(Debug)]
enum SessionCommand {
    Submit {
        player: PlayerId,
        action: Action,
        reply: oneshot::Sender<Result<Submission>>,
    },
    SetConnected {
        player: PlayerId,
        connected: bool,
        reply: oneshot::Sender<Result<()>>,
    },
    Status {
        reply: oneshot::Sender<SessionStatus>,
    },
    Shutdown,
}

/// Cheap, cloneable address of a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    commands: mpsc::Sender<SessionCommand>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    /// Session id.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Receive every cycle committed from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Submit an action on behalf of an authenticated player.
    pub async fn submit(&self, player: PlayerId, action: Action) -> Result<Submission> {
        self.request(|reply| SessionCommand::Submit {
            player,
            action,
            reply,
        })
        .await?
    }

    /// Report a player's transport connecting or dropping.
    pub async fn set_connected(&self, player: PlayerId, connected: bool) -> Result<()> {
        self.request(|reply| SessionCommand::SetConnected {
            player,
            connected,
            reply,
        })
        .await?
    }

    /// Current status.
    pub async fn status(&self) -> Result<SessionStatus> {
        self.request(|reply| SessionCommand::Status { reply }).await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| ServerError::SessionClosed(self.id))?;
        response
            .await
            .map_err(|_| ServerError::SessionClosed(self.id))
    }
}

struct SessionTask {
    session: GameSession,
    events: broadcast::Sender<SessionEvent>,
    deadline: Option<Duration>,
    next_deadline: Option<Instant>,
}

impl SessionTask {
    fn new(
        session: GameSession,
        events: broadcast::Sender<SessionEvent>,
        deadline: Option<Duration>,
    ) -> Self {
        let mut task = Self {
            session,
            events,
            deadline,
            next_deadline: None,
        };
        task.rearm();
        task
    }

    async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        let id = self.session.id();
        info!(session = %id, "Session started");
        loop {
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        Some(SessionCommand::Shutdown) | None => break,
                        Some(command) => self.handle(command),
                    }
                }
                () = deadline_reached(self.next_deadline) => {
                    let outcome = self.session.expire_deadline();
                    self.observe(outcome.as_ref().map(Some));
                }
            }
        }
        info!(session = %id, cycle = self.session.simulation().cycle(), "Session stopped");
    }

    fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Submit {
                player,
                action,
                reply,
            } => {
                let outcome = self.session.submit(player, action);
                self.observe(outcome.as_ref().map(|s| match s {
                    Submission::Advanced(report) => Some(report),
                    Submission::Buffered { .. } => None,
                }));
                let _ = reply.send(outcome);
            }
            SessionCommand::SetConnected {
                player,
                connected,
                reply,
            } => {
                let outcome = self.session.set_connected(player, connected);
                self.observe(outcome.as_ref().map(Option::as_ref));
                let _ = reply.send(outcome.map(|_| ()));
            }
            SessionCommand::Status { reply } => {
                let _ = reply.send(self.session.status());
            }
            SessionCommand::Shutdown => {}
        }
    }

    /// Publish a cycle boundary, if one was crossed.
    fn observe(&mut self, outcome: std::result::Result<Option<&CycleReport>, &ServerError>) {
        let id = self.session.id();
        match outcome {
            Ok(Some(report)) => {
                // no subscribers is fine
                let _ = self.events.send(SessionEvent::completed(id, report));
                self.rearm();
            }
            Ok(None) => {}
            Err(ServerError::Game(GameError::InvariantViolation { cycle, message })) => {
                error!(session = %id, cycle, "Turn processing aborted: {message}");
                let _ = self.events.send(SessionEvent::Aborted {
                    session: id,
                    cycle: *cycle,
                    message: message.clone(),
                });
                self.next_deadline = None;
            }
            Err(err) => warn!(session = %id, "Command failed: {err}"),
        }
    }

    fn rearm(&mut self) {
        self.next_deadline = if self.session.is_finished() {
            None
        } else {
            self.deadline.map(|d| Instant::now() + d)
        };
    }
}

async fn deadline_reached(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

/// Hosts any number of independent sessions.
#[derive(Debug)]
pub struct SessionManager {
    config: ServerConfig,
    sessions: BTreeMap<SessionId, (SessionHandle, JoinHandle<()>)>,
    next_id: u64,
}

impl SessionManager {
    /// Empty manager.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            sessions: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Configuration in force.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Number of hosted sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is hosted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Ids of hosted sessions.
    #[must_use]
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.keys().copied().collect()
    }

    /// Handle to a hosted session.
    #[must_use]
    pub fn session(&self, id: SessionId) -> Option<SessionHandle> {
        self.sessions.get(&id).map(|(handle, _)| handle.clone())
    }

    /// Build a scenario and start hosting it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn create_session(&mut self, scenario: &Scenario) -> Result<SessionHandle> {
        let max = self.config.max_players;
        if scenario.players.len() > usize::from(max) {
            return Err(ServerError::TooManyPlayers {
                players: scenario.players.len(),
                max,
            });
        }
        let state = scenario.build()?;
        let handle = self.host(Simulation::new(state, scenario.rules()))?;
        info!(session = %handle.id(), scenario = %scenario.name, "Session created");
        Ok(handle)
    }

    /// Start hosting an existing simulation.
    pub fn host(&mut self, sim: Simulation) -> Result<SessionHandle> {
        self.reap();
        if self.sessions.len() >= self.config.max_sessions {
            return Err(ServerError::ServerFull {
                max: self.config.max_sessions,
            });
        }

        let id = SessionId(self.next_id);
        self.next_id += 1;

        let (commands, inbox) = mpsc::channel(self.config.command_buffer.max(1));
        let (events, _) = broadcast::channel(self.config.event_buffer.max(1));
        let task = SessionTask::new(GameSession::new(id, sim), events.clone(), self.config.cycle_deadline());
        let join = tokio::spawn(task.run(inbox));

        let handle = SessionHandle {
            id,
            commands,
            events,
        };
        self.sessions.insert(id, (handle.clone(), join));
        Ok(handle)
    }

    /// Stop a session and wait for its task to finish.
    pub async fn close(&mut self, id: SessionId) -> Result<()> {
        let (handle, join) = self
            .sessions
            .remove(&id)
            .ok_or(ServerError::UnknownSession(id))?;
        // a closed inbox stops the task just the same
        let _ = handle.commands.send(SessionCommand::Shutdown).await;
        if let Err(err) = join.await {
            error!(session = %id, "Session task failed: {err}");
        }
        Ok(())
    }

    /// Stop every session.
    pub async fn shutdown(&mut self) {
        for id in self.ids() {
            let _ = self.close(id).await;
        }
    }

    /// Forget sessions whose task has ended.
    fn reap(&mut self) {
        self.sessions.retain(|_, (_, join)| !join.is_finished());
    }
}
