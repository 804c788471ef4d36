/*
    Copyright 2025 MydriaTech AB

    Licensed under the Apache License 2.0 with Free world makers exception
    1.0.0 (the "License"); you may not use this file except in compliance with
    the License. You should have obtained a copy of the License with the source
    or binary distribution in file named

        LICENSE-Apache-2.0-with-FWM-Exception-1.0.0

    Unless required by applicable law or agreed to in writing, software
    distributed under the License is distributed on an "AS IS" BASIS,
    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
    See the License for the specific language governing permissions and
    limitations under the License.
*/

/*! Persistent channel to a single query endpoint.

A [Connection] owns one transport at a time and keeps it alive:

* heartbeat pings on a fixed interval with round trip latency statistics,
* answers to pings from the peer,
* re-establishment of lost transports following the
  [crate::conf::ReconnectPolicy],
* queued (non-blocking) delivery of data frames to all attached
  subscribers.

Subscriber records live in an arena keyed by subscription id that is
independent of the current transport, so they survive reconnects.
*/

mod connection_state;
mod connector;
mod latency_tracker;
#[cfg(test)]
pub(crate) mod scripted_connector;
mod subscriber_event;
mod web_socket_connector;

pub use self::connection_state::ConnectionState;
pub use self::connector::Connector;
pub use self::connector::FrameSink;
pub use self::connector::Transport;
pub use self::connector::TransportEvent;
pub use self::connector::TransportEventStream;
pub use self::latency_tracker::LatencyTracker;
pub(crate) use self::subscriber_event::SubscriberEvent;
pub use self::web_socket_connector::WebSocketConnector;

use crate::ObservableError;
use crate::ObservableErrorKind;
use crate::conf::ConnectionConfig;
use crate::endpoint::QueryEndpoint;
use crate::frame::Frame;
use crate::frame::FrameType;
use crossbeam_skiplist::SkipMap;
use futures::SinkExt;
use futures::StreamExt;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::OnceLock;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::sync::mpsc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio::time::MissedTickBehavior;

/// Reason a transport session ended.
enum SessionEnd {
    /// Explicit close of the [Connection].
    Terminated,
    /// The peer completed the query.
    Completed,
    /// The query's source failed at the peer.
    SourceFailed(ObservableError),
    /// Transport was lost and should be re-established.
    Lost(ObservableError),
}

/// Persistent channel to a single query endpoint.
pub struct Connection {
    id: u64,
    endpoint: QueryEndpoint,
    config: ConnectionConfig,
    connector: Arc<dyn Connector>,
    state_tx: watch::Sender<ConnectionState>,
    latency: LatencyTracker,
    subscribers: SkipMap<u64, UnboundedSender<SubscriberEvent>>,
    /// Payload of the most recent data frame of the current session.
    latest_data: Mutex<Option<Value>>,
    control_tx: UnboundedSender<Frame>,
    terminal_event: OnceLock<SubscriberEvent>,
    termination_signaled: AtomicBool,
    termination_semaphore: Semaphore,
}

impl Connection {
    /// Pings older than this many heartbeats are no longer matched with
    /// pongs.
    const MAX_OUTSTANDING_PINGS: usize = 16;

    /// Create a new instance and start connecting in the background.
    ///
    /// The returned instance is in [ConnectionState::Connecting].
    pub fn open(
        id: u64,
        endpoint: QueryEndpoint,
        config: ConnectionConfig,
        connector: Arc<dyn Connector>,
    ) -> Arc<Self> {
        let (state_tx, _state_rx) = watch::channel(ConnectionState::Connecting);
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let connection = Arc::new(Self {
            id,
            endpoint,
            config,
            connector,
            state_tx,
            latency: LatencyTracker::default(),
            subscribers: SkipMap::new(),
            latest_data: Mutex::default(),
            control_tx,
            terminal_event: OnceLock::new(),
            termination_signaled: AtomicBool::new(false),
            termination_semaphore: Semaphore::new(0),
        });
        let self_clone = Arc::clone(&connection);
        tokio::spawn(async move { self_clone.maintain_connection(control_rx).await });
        connection
    }

    /// Locally unique identifier of this connection.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The endpoint this connection is bound to.
    pub fn endpoint(&self) -> &QueryEndpoint {
        &self.endpoint
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Wait for the next state change and return the new state.
    ///
    /// Returns immediately when already [ConnectionState::Closed].
    pub async fn await_state_change(&self) -> ConnectionState {
        let mut state_rx = self.state_tx.subscribe();
        if state_rx.borrow_and_update().eq(&ConnectionState::Closed) {
            return ConnectionState::Closed;
        }
        let _ = state_rx.changed().await;
        *state_rx.borrow()
    }

    /// Wait until the state satisfies `predicate` and return that state.
    pub async fn wait_for_state<F>(&self, predicate: F) -> ConnectionState
    where
        F: FnMut(&ConnectionState) -> bool,
    {
        let mut state_rx = self.state_tx.subscribe();
        let res = state_rx.wait_for(predicate).await.map(|state| *state);
        res.unwrap_or_else(|_| self.state())
    }

    /// Most recent heartbeat round trip time. Zero until the first pong.
    pub fn last_ping_latency(&self) -> Duration {
        self.latency.last()
    }

    /// Mean heartbeat round trip time. Zero until the first pong.
    pub fn average_latency(&self) -> Duration {
        self.latency.average()
    }

    /// Number of completed heartbeat round trips.
    pub fn latency_samples(&self) -> u64 {
        self.latency.samples()
    }

    /// Number of attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Queue a control frame for the peer.
    ///
    /// Data only flows from server to client, so [Frame::Data] is rejected.
    /// Frames queued while reconnecting are sent once the transport is
    /// re-established.
    pub fn send(&self, frame: Frame) -> Result<(), ObservableError> {
        if frame.frame_type() == FrameType::Data {
            return Err(ObservableErrorKind::Unspecified
                .error_with_msg("Data frames are only sent by the server."));
        }
        if self.state().is_closing_or_closed() {
            return Err(ObservableErrorKind::TransportError
                .error_with_msg(format!("Connection {} is closed.", self.id)));
        }
        self.control_tx.send(frame).map_err(|_| {
            ObservableErrorKind::TransportError
                .error_with_msg(format!("Connection {} is closed.", self.id))
        })
    }

    /// Close this connection.
    ///
    /// Pending connect attempts, backoff waits and receives are cancelled.
    /// Subscribers that are still attached are signaled completion.
    pub fn close(&self) {
        let modified = self.state_tx.send_if_modified(|state| {
            if state.is_closing_or_closed() {
                false
            } else {
                *state = ConnectionState::Closing;
                true
            }
        });
        if modified && log::log_enabled!(log::Level::Debug) {
            log::debug!("Closing connection {} to '{}'.", self.id, self.endpoint);
        }
        self.signal_termination();
    }

    /// Attach a subscriber queue.
    ///
    /// A subscriber that joins an open connection first receives the most
    /// recent data of the current session. A subscriber attached to a
    /// connection that has already terminated immediately receives the
    /// terminal event.
    pub(crate) fn attach(&self, subscription_id: u64, tx: UnboundedSender<SubscriberEvent>) {
        {
            // Held while inserting so that no newer value is dispatched in between
            let latest_data = self.lock_latest_data();
            if self.state() == ConnectionState::Open
                && let Some(data) = latest_data.as_ref()
            {
                let _ = tx.send(SubscriberEvent::Next(data.clone()));
            }
            self.subscribers.insert(subscription_id, tx);
        }
        if let Some(terminal_event) = self.terminal_event.get()
            && let Some(entry) = self.subscribers.remove(&subscription_id)
        {
            let _ = entry.value().send(terminal_event.clone());
        }
    }

    /// Detach a subscriber queue and return the number of remaining
    /// subscribers.
    pub(crate) fn detach(&self, subscription_id: u64) -> usize {
        self.subscribers.remove(&subscription_id);
        self.subscribers.len()
    }

    fn lock_latest_data(&self) -> std::sync::MutexGuard<'_, Option<Value>> {
        self.latest_data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn await_termination(&self) {
        let _ = self.termination_semaphore.acquire().await;
    }

    fn signal_termination(&self) {
        // Only add permits once.
        if !self.termination_signaled.swap(true, Ordering::Relaxed) {
            self.termination_semaphore
                .add_permits(Semaphore::MAX_PERMITS);
        }
    }

    /// Move to `next` unless the connection is closing.
    ///
    /// Return `false` if the connection is closing or closed.
    fn transition(&self, next: ConnectionState) -> bool {
        let mut previous = None;
        self.state_tx.send_if_modified(|state| {
            if state.is_closing_or_closed() || *state == next {
                false
            } else {
                previous = Some(*state);
                *state = next;
                true
            }
        });
        if let Some(previous) = previous
            && log::log_enabled!(log::Level::Debug)
        {
            log::debug!("Connection {}: {previous} -> {next}", self.id);
        }
        !self.state().is_closing_or_closed()
    }

    /// Connect, run sessions and reconnect until closed or the retry policy
    /// is exhausted.
    async fn maintain_connection(self: Arc<Self>, mut control_rx: UnboundedReceiver<Frame>) {
        let policy = self.config.reconnect_policy().clone();
        let mut failed_attempts = 0u32;
        let failure = loop {
            let connect_res = tokio::select! {
                res = self.connector.connect(self.endpoint.url()) => res,
                _ = self.await_termination() => break None,
            };
            match connect_res {
                Ok(transport) => {
                    failed_attempts = 0;
                    if !self.transition(ConnectionState::Open) {
                        break None;
                    }
                    log::info!("Connection {} to '{}' is open.", self.id, self.endpoint);
                    let session_end = self.run_session(transport, &mut control_rx).await;
                    // The server sends the current value again on the next session
                    self.lock_latest_data().take();
                    match session_end {
                        SessionEnd::Terminated | SessionEnd::Completed => break None,
                        SessionEnd::SourceFailed(e) => break Some(e),
                        SessionEnd::Lost(e) => {
                            log::info!(
                                "Connection {} to '{}' was lost: {e}",
                                self.id,
                                self.endpoint
                            );
                        }
                    }
                }
                Err(e) if !e.is_retryable() => {
                    log::info!("Connection {} to '{}' was rejected: {e}", self.id, self.endpoint);
                    break Some(e);
                }
                Err(e) => {
                    failed_attempts += 1;
                    if log::log_enabled!(log::Level::Debug) {
                        log::debug!(
                            "Connect attempt {failed_attempts} of connection {} failed: {e}",
                            self.id
                        );
                    }
                    if !policy.allows_retry(failed_attempts) {
                        break Some(ObservableErrorKind::TransportError.error_with_msg(format!(
                            "Gave up after {failed_attempts} failed connect attempts. Last error: {e}"
                        )));
                    }
                }
            }
            if !self.transition(ConnectionState::Reconnecting) {
                break None;
            }
            let delay = policy.delay(failed_attempts + 1);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {},
                _ = self.await_termination() => break None,
            }
        };
        self.finish(failure);
    }

    /// Enter the terminal state and signal all remaining subscribers once.
    fn finish(&self, failure: Option<ObservableError>) {
        let terminal_event = match failure {
            Some(e) => {
                log::info!("Connection {} to '{}' failed: {e}", self.id, self.endpoint);
                SubscriberEvent::Failed(e)
            }
            None => SubscriberEvent::Completed,
        };
        let terminal_event = self.terminal_event.get_or_init(|| terminal_event).clone();
        self.state_tx.send_replace(ConnectionState::Closed);
        self.signal_termination();
        while let Some(entry) = self.subscribers.pop_front() {
            let _ = entry.value().send(terminal_event.clone());
        }
        if log::log_enabled!(log::Level::Debug) {
            log::debug!("Connection {} to '{}' is closed.", self.id, self.endpoint);
        }
    }

    /// Run heartbeat and receive loop over a single transport.
    async fn run_session(
        &self,
        transport: Transport,
        control_rx: &mut UnboundedReceiver<Frame>,
    ) -> SessionEnd {
        let Transport {
            mut sink,
            mut events,
        } = transport;
        let ping_interval = self.config.ping_interval();
        let mut heartbeat = tokio::time::interval_at(Instant::now() + ping_interval, ping_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut outstanding_pings = VecDeque::with_capacity(Self::MAX_OUTSTANDING_PINGS);
        let session_end = loop {
            tokio::select! {
                _ = self.await_termination() => break SessionEnd::Terminated,
                _ = heartbeat.tick() => {
                    let timestamp = crate::time::get_timestamp_millis();
                    if outstanding_pings.len() == Self::MAX_OUTSTANDING_PINGS {
                        outstanding_pings.pop_front();
                    }
                    outstanding_pings.push_back(timestamp);
                    if let Err(e) = Self::send_frame(&mut sink, &Frame::ping(timestamp)).await {
                        break SessionEnd::Lost(e);
                    }
                    if log::log_enabled!(log::Level::Trace) {
                        log::trace!("Connection {} sent ping {timestamp}.", self.id);
                    }
                },
                Some(frame) = control_rx.recv() => {
                    if let Err(e) = Self::send_frame(&mut sink, &frame).await {
                        break SessionEnd::Lost(e);
                    }
                },
                event = events.next() => match event {
                    Some(TransportEvent::Text(text)) => {
                        if let Err(e) = self.handle_text(&text, &mut sink, &mut outstanding_pings).await {
                            break SessionEnd::Lost(e);
                        }
                    }
                    Some(TransportEvent::Closed { code, reason }) => {
                        break Self::classify_close(code, &reason);
                    }
                    Some(TransportEvent::Failed(e)) => break SessionEnd::Lost(e),
                    None => {
                        break SessionEnd::Lost(
                            ObservableErrorKind::TransportError
                                .error_with_msg("Transport ended without close."),
                        );
                    }
                },
            }
        };
        if !matches!(session_end, SessionEnd::Lost(_))
            && let Err(e) = sink.close().await
        {
            log::debug!("Failed to close transport of connection {}: {e}", self.id);
        }
        session_end
    }

    fn classify_close(code: Option<u16>, reason: &str) -> SessionEnd {
        match code {
            Some(TransportEvent::CLOSE_COMPLETED) => SessionEnd::Completed,
            Some(TransportEvent::CLOSE_SOURCE_FAILURE) => SessionEnd::SourceFailed(
                ObservableErrorKind::SourceFailure.error_with_msg(reason),
            ),
            code => SessionEnd::Lost(ObservableErrorKind::TransportError.error_with_msg(format!(
                "Closed by peer with code {code:?}: '{reason}'"
            ))),
        }
    }

    async fn send_frame(sink: &mut FrameSink, frame: &Frame) -> Result<(), ObservableError> {
        sink.send(frame.encode()?).await
    }

    /// Handle a single inbound frame. Malformed frames are dropped.
    async fn handle_text(
        &self,
        text: &str,
        sink: &mut FrameSink,
        outstanding_pings: &mut VecDeque<i64>,
    ) -> Result<(), ObservableError> {
        match Frame::decode(text) {
            Ok(Frame::Data { data }) => self.dispatch_data(data),
            Ok(Frame::Ping { timestamp }) => {
                Self::send_frame(sink, &Frame::pong(timestamp)).await?;
            }
            Ok(Frame::Pong { timestamp }) => self.handle_pong(timestamp, outstanding_pings),
            Err(e) => {
                log::debug!("Dropping frame on connection {}: {e}", self.id);
            }
        }
        Ok(())
    }

    fn handle_pong(&self, timestamp: i64, outstanding_pings: &mut VecDeque<i64>) {
        if let Some(position) = outstanding_pings.iter().position(|sent| *sent == timestamp) {
            // Pongs for older pings will not arrive after this one
            outstanding_pings.drain(..=position);
            let now = crate::time::get_timestamp_millis();
            let round_trip_millis = u64::try_from(now - timestamp).unwrap_or(0);
            self.latency.record(Duration::from_millis(round_trip_millis));
            if log::log_enabled!(log::Level::Trace) {
                log::trace!(
                    "Connection {} round trip: {round_trip_millis} ms. Average: {:?}",
                    self.id,
                    self.latency.average()
                );
            }
        } else if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "Connection {} ignored pong for unknown ping {timestamp}.",
                self.id
            );
        }
    }

    /// Queue data for every attached subscriber and remember it for
    /// subscribers that attach later.
    fn dispatch_data(&self, data: Value) {
        let mut latest_data = self.lock_latest_data();
        for entry in self.subscribers.iter() {
            if entry.value().send(SubscriberEvent::Next(data.clone())).is_err() {
                entry.remove();
            }
        }
        *latest_data = Some(data);
    }
}

#[cfg(test)]
mod tests {
    use super::scripted_connector::Script;
    use super::scripted_connector::ScriptedConnector;
    use super::*;
    use crate::conf::ReconnectPolicy;
    use serde_json::json;

    fn initialize_env_logger() {
        env_logger::builder()
            .is_test(true)
            .filter_level(log::LevelFilter::Debug)
            .try_init()
            .map_err(|e| {
                log::trace!("Env logger for testing was probably already initialized: {e:?}")
            })
            .ok();
    }

    fn config(ping_interval: Duration, max_attempts: u32) -> ConnectionConfig {
        ConnectionConfig::default()
            .with_ping_interval(ping_interval)
            .with_reconnect_policy(ReconnectPolicy::new(
                max_attempts,
                Duration::from_millis(1),
                Duration::from_millis(5),
            ))
    }

    fn open(connector: &Arc<ScriptedConnector>, config: ConnectionConfig) -> Arc<Connection> {
        Connection::open(
            1,
            QueryEndpoint::from_url("http://localhost/api/items"),
            config,
            Arc::clone(connector) as Arc<dyn Connector>,
        )
    }

    async fn within<F: Future>(future: F) -> F::Output {
        tokio::time::timeout(Duration::from_secs(5), future)
            .await
            .expect("Timed out.")
    }

    #[tokio::test]
    async fn test_heartbeat_latency() {
        initialize_env_logger();
        let (accept, mut peers) = ScriptedConnector::accept();
        let connector = ScriptedConnector::new(vec![accept]);
        let connection = open(&connector, config(Duration::from_millis(20), 3));
        assert_eq!(connection.last_ping_latency(), Duration::ZERO);
        assert_eq!(connection.average_latency(), Duration::ZERO);
        let mut peer = within(peers.recv()).await.unwrap();
        let Some(Frame::Ping { timestamp }) = within(peer.next_frame()).await else {
            panic!("Expected ping.");
        };
        assert_eq!(connection.latency_samples(), 0);
        peer.send(&Frame::pong(timestamp));
        within(async {
            while connection.latency_samples() == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert_eq!(connection.latency_samples(), 1);
        assert!(connection.average_latency() >= Duration::ZERO);
        assert_eq!(connection.state(), ConnectionState::Open);
        connection.close();
        within(connection.wait_for_state(|state| *state == ConnectionState::Closed)).await;
    }

    #[tokio::test]
    async fn test_answers_peer_ping() {
        initialize_env_logger();
        let (accept, mut peers) = ScriptedConnector::accept();
        let connector = ScriptedConnector::new(vec![accept]);
        let connection = open(&connector, config(Duration::from_secs(60), 3));
        let mut peer = within(peers.recv()).await.unwrap();
        peer.send(&Frame::ping(123));
        assert_eq!(within(peer.next_frame()).await, Some(Frame::pong(123)));
        connection.close();
    }

    #[tokio::test]
    async fn test_malformed_frames_are_dropped() {
        initialize_env_logger();
        let (accept, mut peers) = ScriptedConnector::accept();
        let connector = ScriptedConnector::new(vec![accept]);
        let connection = open(&connector, config(Duration::from_secs(60), 3));
        let (tx, mut rx) = mpsc::unbounded_channel();
        connection.attach(7, tx);
        let peer = within(peers.recv()).await.unwrap();
        let _ = peer
            .to_client
            .send(TransportEvent::Text(r#"{"type":"Unknown"}"#.to_string()));
        let _ = peer.to_client.send(TransportEvent::Text("garbage".to_string()));
        peer.send(&Frame::data(json!("after")));
        let Some(SubscriberEvent::Next(value)) = within(rx.recv()).await else {
            panic!("Expected data.");
        };
        assert_eq!(value, json!("after"));
        assert_eq!(connection.state(), ConnectionState::Open);
        connection.close();
    }

    #[tokio::test]
    async fn test_reconnect_preserves_subscribers() {
        initialize_env_logger();
        let (accept1, mut peers1) = ScriptedConnector::accept();
        let (accept2, mut peers2) = ScriptedConnector::accept();
        let connector = ScriptedConnector::new(vec![accept1, accept2]);
        let connection = open(&connector, config(Duration::from_secs(60), 3));
        let (tx, mut rx) = mpsc::unbounded_channel();
        connection.attach(7, tx);
        let peer1 = within(peers1.recv()).await.unwrap();
        peer1.send(&Frame::data(json!("a")));
        assert!(matches!(within(rx.recv()).await, Some(SubscriberEvent::Next(v)) if v == json!("a")));
        // Lose the transport
        drop(peer1);
        let peer2 = within(peers2.recv()).await.unwrap();
        within(connection.wait_for_state(|state| *state == ConnectionState::Open)).await;
        peer2.send(&Frame::data(json!("b")));
        assert!(matches!(within(rx.recv()).await, Some(SubscriberEvent::Next(v)) if v == json!("b")));
        assert_eq!(connector.attempts(), 2);
        assert_eq!(connection.subscriber_count(), 1);
        connection.close();
    }

    #[tokio::test]
    async fn test_late_subscriber_receives_latest_data() {
        initialize_env_logger();
        let (accept1, mut peers1) = ScriptedConnector::accept();
        let (accept2, mut peers2) = ScriptedConnector::accept();
        let connector = ScriptedConnector::new(vec![accept1, accept2]);
        let connection = open(&connector, config(Duration::from_secs(60), 3));
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        connection.attach(1, tx1);
        let peer1 = within(peers1.recv()).await.unwrap();
        peer1.send(&Frame::data(json!("Initial")));
        peer1.send(&Frame::data(json!("Second")));
        assert!(matches!(within(rx1.recv()).await, Some(SubscriberEvent::Next(v)) if v == json!("Initial")));
        assert!(matches!(within(rx1.recv()).await, Some(SubscriberEvent::Next(v)) if v == json!("Second")));
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        connection.attach(2, tx2);
        assert!(matches!(within(rx2.recv()).await, Some(SubscriberEvent::Next(v)) if v == json!("Second")));
        // Values of a lost session are not replayed
        drop(peer1);
        let peer2 = within(peers2.recv()).await.unwrap();
        within(connection.wait_for_state(|state| *state == ConnectionState::Open)).await;
        let (tx3, mut rx3) = mpsc::unbounded_channel();
        connection.attach(3, tx3);
        assert!(rx3.try_recv().is_err());
        peer2.send(&Frame::data(json!("Fresh")));
        for rx in [&mut rx1, &mut rx2, &mut rx3] {
            assert!(matches!(within(rx.recv()).await, Some(SubscriberEvent::Next(v)) if v == json!("Fresh")));
        }
        connection.close();
    }

    #[tokio::test]
    async fn test_retry_exhaustion_signals_once() {
        initialize_env_logger();
        let connector = ScriptedConnector::new(vec![]);
        let connection = open(&connector, config(Duration::from_secs(60), 3));
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        connection.attach(1, tx1);
        connection.attach(2, tx2);
        within(connection.wait_for_state(|state| *state == ConnectionState::Closed)).await;
        assert_eq!(connector.attempts(), 3);
        for rx in [&mut rx1, &mut rx2] {
            let Some(SubscriberEvent::Failed(e)) = within(rx.recv()).await else {
                panic!("Expected failure.");
            };
            assert_eq!(e.kind(), &ObservableErrorKind::TransportError);
            assert!(rx.try_recv().is_err());
        }
        assert_eq!(connection.subscriber_count(), 0);
        // Late subscribers learn about the failure right away
        let (tx3, mut rx3) = mpsc::unbounded_channel();
        connection.attach(3, tx3);
        assert!(matches!(
            within(rx3.recv()).await,
            Some(SubscriberEvent::Failed(_))
        ));
        assert!(connection.send(Frame::ping(1)).is_err());
    }

    #[tokio::test]
    async fn test_rejected_query_is_not_retried() {
        initialize_env_logger();
        let connector = ScriptedConnector::new(vec![Script::Fail(
            ObservableErrorKind::QueryNotFound.error(),
        )]);
        let connection = open(&connector, config(Duration::from_secs(60), 5));
        let (tx, mut rx) = mpsc::unbounded_channel();
        connection.attach(1, tx);
        let Some(SubscriberEvent::Failed(e)) = within(rx.recv()).await else {
            panic!("Expected failure.");
        };
        assert_eq!(e.kind(), &ObservableErrorKind::QueryNotFound);
        assert_eq!(connector.attempts(), 1);
        assert_eq!(connection.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_close_cancels_pending_connect() {
        initialize_env_logger();
        let connector = ScriptedConnector::new(vec![Script::Hang]);
        let connection = open(&connector, config(Duration::from_secs(60), 5));
        let (tx, mut rx) = mpsc::unbounded_channel();
        connection.attach(1, tx);
        within(async {
            while connector.attempts() == 0 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await;
        assert_eq!(connection.state(), ConnectionState::Connecting);
        connection.close();
        assert_eq!(
            within(connection.wait_for_state(|state| *state == ConnectionState::Closed)).await,
            ConnectionState::Closed
        );
        assert!(matches!(
            within(rx.recv()).await,
            Some(SubscriberEvent::Completed)
        ));
    }

    #[tokio::test]
    async fn test_peer_completion_and_source_failure() {
        initialize_env_logger();
        for (code, completed) in [
            (TransportEvent::CLOSE_COMPLETED, true),
            (TransportEvent::CLOSE_SOURCE_FAILURE, false),
        ] {
            let (accept, mut peers) = ScriptedConnector::accept();
            let connector = ScriptedConnector::new(vec![accept]);
            let connection = open(&connector, config(Duration::from_secs(60), 5));
            let (tx, mut rx) = mpsc::unbounded_channel();
            connection.attach(1, tx);
            let peer = within(peers.recv()).await.unwrap();
            peer.close(code);
            match within(rx.recv()).await {
                Some(SubscriberEvent::Completed) => assert!(completed),
                Some(SubscriberEvent::Failed(e)) => {
                    assert!(!completed);
                    assert_eq!(e.kind(), &ObservableErrorKind::SourceFailure);
                }
                other => panic!("Unexpected event: {other:?}"),
            }
            within(connection.wait_for_state(|state| *state == ConnectionState::Closed)).await;
            assert_eq!(connector.attempts(), 1);
        }
    }

    #[tokio::test]
    async fn test_control_frames_only() {
        initialize_env_logger();
        let (accept, mut peers) = ScriptedConnector::accept();
        let connector = ScriptedConnector::new(vec![accept]);
        let connection = open(&connector, config(Duration::from_secs(60), 5));
        assert!(connection.send(Frame::data(json!(1))).is_err());
        connection.send(Frame::ping(99)).unwrap();
        let mut peer = within(peers.recv()).await.unwrap();
        assert_eq!(within(peer.next_frame()).await, Some(Frame::ping(99)));
        connection.close();
    }
}
