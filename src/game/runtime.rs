//! Server runtime: client registry, input sessions and the authoritative tick loop

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::store::{MatchOutcome, ResultStore};
use crate::util::time::Timer;
use crate::ws::protocol::ClientMsg;

use super::client::{ClientSession, ClientStatus, InputApply};
use super::session::{GameSession, SessionEvent, TickOutcome};
use super::snapshot::SnapshotBuilder;
use super::state::GameStatus;
use super::tuning::GameConfig;

pub type ClientId = Uuid;

/// Close code sent when a socket is dropped after a failed write
pub const CLOSE_WRITE_FAILED: u16 = 1011;
/// Close code sent on server shutdown
pub const CLOSE_GOING_AWAY: u16 = 1001;

const EVENT_CHANNEL_CAPACITY: usize = 1024;
/// Log snapshot stats once per this many ticks
const STATS_LOG_INTERVAL_TICKS: u64 = 600;

/// Outbound half of a client connection
pub trait ClientSink: Send {
    /// Queue a text frame without waiting
    fn send(&self, frame: String) -> Result<(), SinkError>;
    fn close(&self, code: u16);
    fn is_open(&self) -> bool;
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("connection closed")]
    Closed,

    #[error("outbound buffer full")]
    Backpressure,
}

/// Inputs to the runtime task, produced by socket handlers
pub enum RuntimeEvent {
    Connected {
        client_id: ClientId,
        sink: Box<dyn ClientSink>,
    },
    Message {
        client_id: ClientId,
        msg: ClientMsg,
    },
    Disconnected {
        client_id: ClientId,
    },
}

/// Counters readable outside the runtime task
#[derive(Debug)]
pub struct RuntimeStats {
    connected: AtomicUsize,
    tick: AtomicU64,
    status: RwLock<GameStatus>,
}

impl RuntimeStats {
    fn new() -> Self {
        Self {
            connected: AtomicUsize::new(0),
            tick: AtomicU64::new(0),
            status: RwLock::new(GameStatus::Waiting),
        }
    }

    pub fn connected_clients(&self) -> usize {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn tick(&self) -> u64 {
        self.tick.load(Ordering::Relaxed)
    }

    pub fn game_status(&self) -> GameStatus {
        *self.status.read()
    }
}

/// Handle to the running runtime task
#[derive(Clone)]
pub struct RuntimeHandle {
    events_tx: mpsc::Sender<RuntimeEvent>,
    stop_tx: Arc<watch::Sender<bool>>,
    pub stats: Arc<RuntimeStats>,
}

impl RuntimeHandle {
    /// Forward an event to the runtime; false once the runtime has stopped
    pub async fn send(&self, event: RuntimeEvent) -> bool {
        self.events_tx.send(event).await.is_ok()
    }

    /// Stop the tick loop after the current tick
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}

struct ConnectedClient {
    session: ClientSession,
    sink: Box<dyn ClientSink>,
}

/// Authoritative runtime; the only writer of the `GameState`
pub struct GameRuntime {
    session: GameSession,
    clients: HashMap<ClientId, ConnectedClient>,
    controller: Option<ClientId>,
    snapshots: SnapshotBuilder,
    results: Arc<dyn ResultStore>,
    stats: Arc<RuntimeStats>,
    tick_duration: Duration,
    events_rx: mpsc::Receiver<RuntimeEvent>,
    stop_rx: watch::Receiver<bool>,
}

impl GameRuntime {
    pub fn new(
        config: GameConfig,
        results: Arc<dyn ResultStore>,
        tick_duration: Duration,
    ) -> (Self, RuntimeHandle) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (stop_tx, stop_rx) = watch::channel(false);
        let stats = Arc::new(RuntimeStats::new());

        let handle = RuntimeHandle {
            events_tx,
            stop_tx: Arc::new(stop_tx),
            stats: stats.clone(),
        };

        let runtime = Self {
            session: GameSession::new(config),
            clients: HashMap::new(),
            controller: None,
            snapshots: SnapshotBuilder::new(),
            results,
            stats,
            tick_duration,
            events_rx,
            stop_rx,
        };

        (runtime, handle)
    }

    /// Run until stopped. Ticks never overlap; a slow tick delays the next one.
    pub async fn run(mut self) {
        info!(tick_ms = self.tick_duration.as_secs_f64() * 1000.0, "Runtime started");

        let mut ticker = interval(self.tick_duration);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                changed = self.stop_rx.changed() => {
                    if changed.is_err() || *self.stop_rx.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => self.tick(),
                Some(event) = self.events_rx.recv() => self.handle_event(event),
            }
        }

        for client in self.clients.values() {
            client.sink.close(CLOSE_GOING_AWAY);
        }
        info!(tick = self.session.state().tick, "Runtime stopped");
    }

    pub fn handle_event(&mut self, event: RuntimeEvent) {
        match event {
            RuntimeEvent::Connected { client_id, sink } => self.handle_connect(client_id, sink),
            RuntimeEvent::Message { client_id, msg } => self.handle_message(client_id, msg),
            RuntimeEvent::Disconnected { client_id } => self.handle_disconnect(client_id),
        }
    }

    fn handle_connect(&mut self, client_id: ClientId, sink: Box<dyn ClientSink>) {
        self.clients.insert(
            client_id,
            ConnectedClient {
                session: ClientSession::new(),
                sink,
            },
        );
        self.publish_stats();
        info!(client_id = %client_id, clients = self.clients.len(), "Client registered");
    }

    fn handle_message(&mut self, client_id: ClientId, msg: ClientMsg) {
        let Some(client) = self.clients.get_mut(&client_id) else {
            debug!(client_id = %client_id, "Message from unregistered client dropped");
            return;
        };

        match client.session.apply_input(&msg) {
            InputApply::Applied => {}
            InputApply::Stale => {
                debug!(
                    client_id = %client_id,
                    seq = ?msg.seq(),
                    last_seq = client.session.last_seq,
                    "Stale input dropped"
                );
            }
            InputApply::Unsequenced => self.handle_ready(client_id),
        }
    }

    /// Restart the match with `client_id` in control
    fn handle_ready(&mut self, client_id: ClientId) {
        if let Some(previous) = self.controller.filter(|id| *id != client_id) {
            if let Some(client) = self.clients.get_mut(&previous) {
                client.session.status = ClientStatus::Connected;
            }
        }
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.session.reset_input();
            client.session.status = ClientStatus::Ready;
        }
        self.controller = Some(client_id);
        self.session.start();
        self.sync_controller_status();
        self.publish_stats();
        info!(client_id = %client_id, "Client took control, match started");
    }

    fn handle_disconnect(&mut self, client_id: ClientId) {
        if self.clients.remove(&client_id).is_none() {
            return;
        }
        info!(client_id = %client_id, clients = self.clients.len(), "Client unregistered");

        if self.controller == Some(client_id) {
            self.controller = self.clients.keys().next().copied();
            match self.controller {
                Some(next) => {
                    let aim_angle = self.session.state().ship.aim_angle;
                    if let Some(client) = self.clients.get_mut(&next) {
                        client.session.take_over_controls(aim_angle);
                    }
                    info!(client_id = %next, "Control transferred");
                    self.sync_controller_status();
                }
                None => {
                    self.session.halt();
                    info!("No clients remain, game waiting");
                }
            }
        }
        self.publish_stats();
    }

    /// Run one simulation tick and broadcast the result
    pub fn tick(&mut self) {
        let timer = Timer::new();
        let input = self
            .controller
            .and_then(|id| self.clients.get(&id))
            .map(|client| client.session.tick_input());

        let outcome = self.session.tick(input.as_ref());
        if !outcome.advanced {
            return;
        }

        self.sync_controller_status();
        self.log_events(&outcome);
        self.record_results(&outcome);
        self.broadcast(&outcome);
        self.publish_stats();

        let elapsed = timer.elapsed();
        if elapsed > self.tick_duration {
            warn!(
                tick = self.session.state().tick,
                elapsed_us = timer.elapsed_micros(),
                "Slow tick"
            );
        }
        if self.session.state().tick % STATS_LOG_INTERVAL_TICKS == 0 {
            let stats = self.snapshots.stats();
            debug!(
                snapshots = stats.total_snapshots,
                avg_bytes = stats.avg_bytes(),
                avg_entities = stats.avg_entities_per_snapshot,
                "Snapshot stats"
            );
        }
    }

    fn log_events(&self, outcome: &TickOutcome) {
        let tick = self.session.state().tick;
        for event in &outcome.events {
            match *event {
                SessionEvent::CountdownFinished => debug!(tick, "Countdown finished"),
                SessionEvent::ProjectilesFired { count } => {
                    trace!(tick, count, "Projectiles fired")
                }
                SessionEvent::AsteroidDestroyed {
                    asteroid_id,
                    size,
                    fragments,
                } => debug!(tick, asteroid_id, size, fragments, "Asteroid destroyed"),
                _ => {}
            }
        }
    }

    fn record_results(&self, outcome: &TickOutcome) {
        for event in &outcome.events {
            if let SessionEvent::GameOver { final_score, wave } = *event {
                self.results.record(&MatchOutcome {
                    controller_id: self.controller,
                    final_score,
                    wave,
                    ticks: self.session.state().tick,
                    finished_at: Utc::now(),
                });
            }
        }
    }

    /// Send the state and event frames to every client; failed sockets are dropped
    fn broadcast(&mut self, outcome: &TickOutcome) {
        let state = match self.snapshots.encode_state(self.session.state()) {
            Ok(raw) => raw,
            Err(e) => {
                error!(error = %e, "Failed to encode game state");
                return;
            }
        };
        let event_frames = match SnapshotBuilder::event_frames(&outcome.events) {
            Ok(frames) => frames,
            Err(e) => {
                error!(error = %e, "Failed to encode game events");
                Vec::new()
            }
        };

        let mut failed = Vec::new();
        for (client_id, client) in &self.clients {
            if !client.sink.is_open() {
                failed.push(*client_id);
                continue;
            }
            let frame = match SnapshotBuilder::state_frame(&state, client.session.last_seq) {
                Ok(frame) => frame,
                Err(e) => {
                    error!(error = %e, "Failed to encode state frame");
                    continue;
                }
            };
            let sent = std::iter::once(frame)
                .chain(event_frames.iter().cloned())
                .try_for_each(|f| client.sink.send(f));
            if let Err(e) = sent {
                warn!(client_id = %client_id, error = %e, "Broadcast failed, dropping client");
                failed.push(*client_id);
            }
        }

        for client_id in failed {
            if let Some(client) = self.clients.get(&client_id) {
                client.sink.close(CLOSE_WRITE_FAILED);
            }
            self.handle_disconnect(client_id);
        }
    }

    /// Keep the controller's lifecycle status in step with the game status
    fn sync_controller_status(&mut self) {
        let game_status = self.session.status();
        let Some(client) = self.controller.and_then(|id| self.clients.get_mut(&id)) else {
            return;
        };
        client.session.status = match game_status {
            GameStatus::Playing => ClientStatus::Playing,
            GameStatus::GameOver => ClientStatus::Ended,
            GameStatus::Countdown => ClientStatus::Ready,
            GameStatus::Waiting => client.session.status,
        };
    }

    fn publish_stats(&self) {
        self.stats.connected.store(self.clients.len(), Ordering::Relaxed);
        self.stats.tick.store(self.session.state().tick, Ordering::Relaxed);
        *self.stats.status.write() = self.session.status();
    }
}

#[cfg(test)]
impl GameRuntime {
    fn controller(&self) -> Option<ClientId> {
        self.controller
    }

    fn game(&self) -> &GameSession {
        &self.session
    }

    fn game_mut(&mut self) -> &mut GameSession {
        &mut self.session
    }

    fn client_session(&self, client_id: &ClientId) -> Option<&ClientSession> {
        self.clients.get(client_id).map(|c| &c.session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::asteroid::AsteroidState;
    use crate::game::ship::InputState;
    use glam::DVec3;
    use parking_lot::Mutex;
    use serde_json::Value;
    use std::sync::atomic::AtomicBool;

    #[derive(Clone, Default)]
    struct FakeSink {
        frames: Arc<Mutex<Vec<String>>>,
        closed_with: Arc<Mutex<Option<u16>>>,
        broken: Arc<AtomicBool>,
    }

    impl FakeSink {
        fn messages(&self) -> Vec<Value> {
            self.frames
                .lock()
                .iter()
                .map(|f| serde_json::from_str(f).unwrap())
                .collect()
        }

        fn last_state(&self) -> Value {
            self.messages()
                .into_iter()
                .rev()
                .find(|m| m["type"] == "state")
                .expect("no state frame")
        }
    }

    impl ClientSink for FakeSink {
        fn send(&self, frame: String) -> Result<(), SinkError> {
            if self.broken.load(Ordering::Relaxed) {
                return Err(SinkError::Closed);
            }
            self.frames.lock().push(frame);
            Ok(())
        }

        fn close(&self, code: u16) {
            *self.closed_with.lock() = Some(code);
        }

        fn is_open(&self) -> bool {
            self.closed_with.lock().is_none()
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        outcomes: Mutex<Vec<MatchOutcome>>,
    }

    impl ResultStore for MemoryStore {
        fn record(&self, outcome: &MatchOutcome) {
            self.outcomes.lock().push(outcome.clone());
        }
    }

    fn runtime() -> (GameRuntime, RuntimeHandle, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let config = GameConfig {
            seed: Some(5),
            ..GameConfig::default()
        };
        let (runtime, handle) = GameRuntime::new(config, store.clone(), Duration::from_millis(16));
        (runtime, handle, store)
    }

    fn connect(runtime: &mut GameRuntime) -> (ClientId, FakeSink) {
        let id = Uuid::new_v4();
        let sink = FakeSink::default();
        runtime.handle_event(RuntimeEvent::Connected {
            client_id: id,
            sink: Box::new(sink.clone()),
        });
        (id, sink)
    }

    fn send(runtime: &mut GameRuntime, client_id: ClientId, msg: ClientMsg) {
        runtime.handle_event(RuntimeEvent::Message { client_id, msg });
    }

    /// Replace the wave with one harmless far-away rock
    fn calm_field(runtime: &mut GameRuntime) {
        runtime.game_mut().state_mut().asteroids =
            vec![AsteroidState::new(900, -DVec3::Z, DVec3::X, 0.0, 4)];
    }

    #[test]
    fn no_ticks_before_ready() {
        let (mut runtime, _handle, _) = runtime();
        let (_, sink) = connect(&mut runtime);
        runtime.tick();
        assert!(sink.messages().is_empty());
        assert_eq!(runtime.game().status(), GameStatus::Waiting);
    }

    #[test]
    fn ready_starts_match_and_grants_control() {
        let (mut runtime, handle, _) = runtime();
        let (a, _) = connect(&mut runtime);
        let (b, _) = connect(&mut runtime);

        send(&mut runtime, b, ClientMsg::Ready);
        assert_eq!(runtime.controller(), Some(b));
        assert_eq!(runtime.game().status(), GameStatus::Playing);
        assert_eq!(runtime.client_session(&b).unwrap().status, ClientStatus::Playing);
        assert_eq!(runtime.client_session(&a).unwrap().status, ClientStatus::Connected);
        assert_eq!(handle.stats.connected_clients(), 2);
        assert_eq!(handle.stats.game_status(), GameStatus::Playing);
    }

    #[test]
    fn every_client_gets_state_with_its_own_watermark() {
        let (mut runtime, handle, _) = runtime();
        let (a, sink_a) = connect(&mut runtime);
        let (b, sink_b) = connect(&mut runtime);
        send(&mut runtime, a, ClientMsg::Ready);
        calm_field(&mut runtime);

        send(&mut runtime, a, ClientMsg::Aim { seq: 3, angle: 0.5 });
        send(&mut runtime, b, ClientMsg::ShootStart { seq: 8 });
        runtime.tick();

        let state_a = sink_a.last_state();
        let state_b = sink_b.last_state();
        assert_eq!(state_a["lastInputSeq"], 3);
        assert_eq!(state_b["lastInputSeq"], 8);
        assert_eq!(state_a["state"], state_b["state"]);
        assert_eq!(state_a["state"]["tick"], 1);
        assert_eq!(handle.stats.tick(), 1);
        // spectator fire is ignored
        assert!(state_a["state"]["projectiles"].as_array().unwrap().is_empty());
    }

    #[test]
    fn stale_and_duplicate_input_is_dropped() {
        let (mut runtime, _handle, _) = runtime();
        let (a, _) = connect(&mut runtime);
        send(&mut runtime, a, ClientMsg::Ready);

        let keys = InputState {
            forward: true,
            ..InputState::default()
        };
        send(
            &mut runtime,
            a,
            ClientMsg::Input {
                seq: 5,
                tick: 1,
                keys,
            },
        );
        send(
            &mut runtime,
            a,
            ClientMsg::Input {
                seq: 3,
                tick: 2,
                keys: InputState::default(),
            },
        );
        send(
            &mut runtime,
            a,
            ClientMsg::Input {
                seq: 5,
                tick: 3,
                keys: InputState::default(),
            },
        );

        let session = runtime.client_session(&a).unwrap();
        assert_eq!(session.last_seq, 5);
        assert_eq!(session.keys, keys);
    }

    #[test]
    fn ready_resets_the_watermark() {
        let (mut runtime, _handle, _) = runtime();
        let (a, _) = connect(&mut runtime);
        send(&mut runtime, a, ClientMsg::Ready);
        send(&mut runtime, a, ClientMsg::ShootStart { seq: 40 });
        send(&mut runtime, a, ClientMsg::Ready);

        let session = runtime.client_session(&a).unwrap();
        assert_eq!(session.last_seq, 0);
        assert!(!session.fire_pressed);
        send(&mut runtime, a, ClientMsg::ShootStart { seq: 1 });
        assert!(runtime.client_session(&a).unwrap().fire_pressed);
    }

    #[test]
    fn input_is_applied_only_inside_the_tick() {
        let (mut runtime, _handle, _) = runtime();
        let (a, _) = connect(&mut runtime);
        send(&mut runtime, a, ClientMsg::Ready);
        calm_field(&mut runtime);

        let before = runtime.game().state().ship.clone();
        send(
            &mut runtime,
            a,
            ClientMsg::Input {
                seq: 1,
                tick: 0,
                keys: InputState {
                    forward: true,
                    ..InputState::default()
                },
            },
        );
        assert_eq!(runtime.game().state().ship, before);
        runtime.tick();
        assert_ne!(runtime.game().state().ship.position, before.position);
    }

    #[test]
    fn messages_from_unknown_clients_are_ignored() {
        let (mut runtime, _handle, _) = runtime();
        send(&mut runtime, Uuid::new_v4(), ClientMsg::Ready);
        assert_eq!(runtime.controller(), None);
        assert_eq!(runtime.game().status(), GameStatus::Waiting);
    }

    #[test]
    fn controller_disconnect_transfers_or_halts() {
        let (mut runtime, _handle, _) = runtime();
        let (a, _) = connect(&mut runtime);
        let (b, _) = connect(&mut runtime);
        send(&mut runtime, a, ClientMsg::Ready);

        runtime.handle_event(RuntimeEvent::Disconnected { client_id: a });
        assert_eq!(runtime.controller(), Some(b));
        assert_eq!(runtime.game().status(), GameStatus::Playing);
        assert_eq!(runtime.client_session(&b).unwrap().status, ClientStatus::Playing);

        runtime.handle_event(RuntimeEvent::Disconnected { client_id: b });
        assert_eq!(runtime.controller(), None);
        assert_eq!(runtime.game().status(), GameStatus::Waiting);
    }

    #[test]
    fn spectator_input_does_not_carry_over_on_transfer() {
        let (mut runtime, _handle, _) = runtime();
        let (a, _) = connect(&mut runtime);
        let (b, _) = connect(&mut runtime);
        send(&mut runtime, a, ClientMsg::Ready);
        calm_field(&mut runtime);

        send(&mut runtime, b, ClientMsg::ShootStart { seq: 1 });
        let forward = InputState {
            forward: true,
            ..InputState::default()
        };
        send(
            &mut runtime,
            b,
            ClientMsg::Input {
                seq: 2,
                tick: 0,
                keys: forward,
            },
        );
        runtime.tick();
        let start = runtime.game().state().ship.position;
        assert!(runtime.game().state().projectiles.is_empty());

        runtime.handle_event(RuntimeEvent::Disconnected { client_id: a });
        assert_eq!(runtime.controller(), Some(b));
        runtime.tick();
        assert!(runtime.game().state().projectiles.is_empty());
        assert_eq!(runtime.game().state().ship.position, start);

        // fresh input from the new controller drives the ship
        send(
            &mut runtime,
            b,
            ClientMsg::Input {
                seq: 3,
                tick: 2,
                keys: forward,
            },
        );
        runtime.tick();
        assert_ne!(runtime.game().state().ship.position, start);
    }

    #[test]
    fn spectator_ready_takes_control_and_restarts() {
        let (mut runtime, _handle, _) = runtime();
        let (a, _) = connect(&mut runtime);
        let (b, sink_b) = connect(&mut runtime);
        send(&mut runtime, a, ClientMsg::Ready);
        calm_field(&mut runtime);
        runtime.game_mut().state_mut().score = 300;
        runtime.tick();
        runtime.tick();
        send(&mut runtime, b, ClientMsg::ShootStart { seq: 12 });

        send(&mut runtime, b, ClientMsg::Ready);
        assert_eq!(runtime.controller(), Some(b));
        assert_eq!(runtime.client_session(&a).unwrap().status, ClientStatus::Connected);
        let session_b = runtime.client_session(&b).unwrap();
        assert_eq!(session_b.status, ClientStatus::Playing);
        assert_eq!(session_b.last_seq, 0);
        assert!(!session_b.fire_pressed);

        let state = runtime.game().state();
        assert_eq!(state.game_status, GameStatus::Playing);
        assert_eq!(state.tick, 0);
        assert_eq!(state.score, 0);
        assert!(state.asteroids.iter().all(|rock| rock.id != 900));

        runtime.tick();
        assert_eq!(sink_b.last_state()["state"]["tick"], 1);
    }

    #[test]
    fn non_lethal_ship_hit_broadcasts_damage() {
        let (mut runtime, _handle, _) = runtime();
        let (a, sink_a) = connect(&mut runtime);
        let (_b, sink_b) = connect(&mut runtime);
        send(&mut runtime, a, ClientMsg::Ready);

        let lives = runtime.game().state().ship.lives;
        assert_eq!(lives, 3);
        runtime.game_mut().state_mut().asteroids =
            vec![AsteroidState::new(1, DVec3::Z, DVec3::X, 0.0, 2)];
        runtime.tick();

        for sink in [&sink_a, &sink_b] {
            let messages = sink.messages();
            assert!(messages.iter().any(|m| m["type"] == "damage" && m["lives"] == 2));
            assert!(!messages.iter().any(|m| m["type"] == "gameOver"));
            let state = sink.last_state();
            assert_eq!(state["state"]["ship"]["lives"], 2);
            assert_eq!(state["state"]["ship"]["invincible"], true);
            assert_eq!(state["state"]["gameStatus"], "playing");
        }
    }

    #[test]
    fn failed_socket_is_dropped_and_others_still_receive() {
        let (mut runtime, handle, _) = runtime();
        let (a, sink_a) = connect(&mut runtime);
        let (b, sink_b) = connect(&mut runtime);
        send(&mut runtime, a, ClientMsg::Ready);
        calm_field(&mut runtime);

        sink_b.broken.store(true, Ordering::Relaxed);
        runtime.tick();

        assert!(runtime.client_session(&b).is_none());
        assert_eq!(*sink_b.closed_with.lock(), Some(CLOSE_WRITE_FAILED));
        assert_eq!(sink_a.last_state()["state"]["tick"], 1);
        assert_eq!(handle.stats.connected_clients(), 1);

        runtime.tick();
        assert_eq!(sink_a.last_state()["state"]["tick"], 2);
    }

    #[test]
    fn game_over_is_broadcast_and_recorded() {
        let (mut runtime, _handle, store) = runtime();
        let (a, sink_a) = connect(&mut runtime);
        let (_b, sink_b) = connect(&mut runtime);
        send(&mut runtime, a, ClientMsg::Ready);

        let state = runtime.game_mut().state_mut();
        state.ship.lives = 1;
        state.score = 75;
        state.asteroids = vec![AsteroidState::new(1, DVec3::Z, DVec3::X, 0.0, 2)];
        runtime.tick();

        for sink in [&sink_a, &sink_b] {
            let messages = sink.messages();
            assert!(messages.iter().any(|m| m["type"] == "damage" && m["lives"] == 0));
            assert!(messages
                .iter()
                .any(|m| m["type"] == "gameOver" && m["finalScore"] == 75 && m["wave"] == 1));
            assert_eq!(sink.last_state()["state"]["gameStatus"], "gameOver");
        }
        assert_eq!(runtime.client_session(&a).unwrap().status, ClientStatus::Ended);

        let outcomes = store.outcomes.lock();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].controller_id, Some(a));
        assert_eq!(outcomes[0].final_score, 75);

        // finished games stop broadcasting until the next ready
        let count = sink_a.messages().len();
        drop(outcomes);
        runtime.tick();
        assert_eq!(sink_a.messages().len(), count);
    }

    #[tokio::test]
    async fn run_loop_ticks_and_stops() {
        let (runtime, handle, _) = runtime();
        let task = tokio::spawn(runtime.run());

        let id = Uuid::new_v4();
        let sink = FakeSink::default();
        assert!(
            handle
                .send(RuntimeEvent::Connected {
                    client_id: id,
                    sink: Box::new(sink.clone()),
                })
                .await
        );
        assert!(
            handle
                .send(RuntimeEvent::Message {
                    client_id: id,
                    msg: ClientMsg::Ready,
                })
                .await
        );

        tokio::time::sleep(Duration::from_millis(120)).await;
        handle.stop();
        tokio_test::assert_ok!(task.await);

        assert!(handle.stats.tick() > 0);
        assert!(!sink.messages().is_empty());
        assert_eq!(*sink.closed_with.lock(), Some(CLOSE_GOING_AWAY));
    }
}
