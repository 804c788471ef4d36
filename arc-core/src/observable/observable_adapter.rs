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

//! Production loop turning an [ObservableSource] into outbound frames.

use super::ChannelCloseReason;
use super::ChannelSession;
use super::ObservableSource;
use super::PeerEvent;
use super::PeerEventStream;
use super::SourceEmission;
use crate::conf::ChannelConfig;
use crate::util::StopSignal;
use arc_client::ObservableError;
use arc_client::ObservableErrorKind;
use arc_client::frame::Frame;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// How an adapter run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterOutcome {
    /// The source completed and the channel was closed normally.
    Completed,
    /// The source failed and the channel was closed.
    SourceFailed(ObservableError),
    /// The client went away.
    PeerDisconnected,
    /// The client was silent for longer than the configured timeout.
    IdleTimeout,
    /// [AdapterHandle::stop] was called.
    Stopped,
}

/// Handle of a started [ObservableAdapter].
pub struct AdapterHandle {
    stop_signal: Arc<StopSignal>,
    join_handle: JoinHandle<AdapterOutcome>,
}

impl AdapterHandle {
    /// Stop pulling from the source and close the channel.
    pub fn stop(&self) {
        self.stop_signal.raise();
    }

    /// Wait for the adapter to finish.
    pub async fn join(self) -> AdapterOutcome {
        self.join_handle.await.unwrap_or_else(|e| {
            AdapterOutcome::SourceFailed(
                ObservableErrorKind::Unspecified
                    .error_with_msg(format!("Adapter task failed: {e}")),
            )
        })
    }
}

/// Sends the emissions of a source as data frames over a channel session.
///
/// Data frames are sent in emission order. Pings from the client are
/// answered with pongs from the same loop, so neither kind of frame is
/// reordered relative to itself.
pub struct ObservableAdapter {
    source: ObservableSource,
    client_timeout: Option<Duration>,
}

impl ObservableAdapter {
    /// Return a new instance.
    pub fn new(source: ObservableSource, channel_config: &ChannelConfig) -> Self {
        Self {
            source,
            client_timeout: channel_config.client_timeout(),
        }
    }

    /// Start the production loop in a background task.
    pub fn start(self, session: Box<dyn ChannelSession>, inbound: PeerEventStream) -> AdapterHandle {
        let stop_signal = StopSignal::new();
        let stop_signal_clone = Arc::clone(&stop_signal);
        let join_handle =
            tokio::spawn(async move { self.run(session, inbound, &stop_signal_clone).await });
        AdapterHandle {
            stop_signal,
            join_handle,
        }
    }

    async fn run(
        self,
        mut session: Box<dyn ChannelSession>,
        mut inbound: PeerEventStream,
        stop_signal: &StopSignal,
    ) -> AdapterOutcome {
        let shape = self.source.shape();
        let mut emissions = self.source.into_emissions();
        let idle_timeout = self.client_timeout.unwrap_or_default();
        let idle_sleep = tokio::time::sleep(idle_timeout);
        tokio::pin!(idle_sleep);
        let mut sent_count = 0u64;
        let (outcome, close_reason) = loop {
            tokio::select! {
                biased;
                _ = stop_signal.raised() => {
                    break (AdapterOutcome::Stopped, Some(ChannelCloseReason::Stopped));
                },
                event = inbound.next() => match event {
                    Some(PeerEvent::Text(text)) => {
                        if self.client_timeout.is_some() {
                            idle_sleep.as_mut().reset(Instant::now() + idle_timeout);
                        }
                        if let Err(e) = Self::handle_text(&mut session, &text).await {
                            log::debug!("Failed to answer client: {e}");
                            break (AdapterOutcome::PeerDisconnected, None);
                        }
                    }
                    Some(PeerEvent::Disconnected) | None => {
                        break (AdapterOutcome::PeerDisconnected, None);
                    }
                },
                () = &mut idle_sleep, if self.client_timeout.is_some() => {
                    log::info!("Closing channel of silent client after {idle_timeout:?}.");
                    break (AdapterOutcome::IdleTimeout, Some(ChannelCloseReason::IdleTimeout));
                },
                emission = emissions.next() => match emission {
                    Some(SourceEmission::Value(value)) => {
                        let res = Frame::data(value).encode();
                        let text = match res {
                            Ok(text) => text,
                            Err(e) => {
                                log::warn!("Dropping value that could not be encoded: {e}");
                                continue;
                            }
                        };
                        if log::log_enabled!(log::Level::Trace) {
                            log::trace!("Sending text: {text}");
                        }
                        if let Err(e) = session.send_text(text).await {
                            log::debug!("Send failed with: {e}");
                            break (AdapterOutcome::PeerDisconnected, None);
                        }
                        sent_count += 1;
                    }
                    Some(SourceEmission::Unserializable(msg)) => {
                        log::warn!("Dropping value that could not be serialized: {msg}");
                    }
                    Some(SourceEmission::Failed(e)) => {
                        log::info!("Closing channel due to source failure: {e}");
                        break (AdapterOutcome::SourceFailed(e), Some(ChannelCloseReason::SourceFailure));
                    }
                    None => {
                        break (AdapterOutcome::Completed, Some(ChannelCloseReason::Completed));
                    }
                },
            }
        };
        // Unsubscribe from the source before closing
        drop(emissions);
        if let Some(close_reason) = close_reason {
            session.close(close_reason).await;
        }
        if log::log_enabled!(log::Level::Debug) {
            log::debug!("Adapter of {shape} source sent {sent_count} values: {outcome:?}");
        }
        outcome
    }

    /// Answer pings. Other client messages are ignored.
    async fn handle_text(
        session: &mut Box<dyn ChannelSession>,
        text: &str,
    ) -> Result<(), ObservableError> {
        match Frame::decode(text) {
            Ok(Frame::Ping { timestamp }) => session.send_text(Frame::pong(timestamp).encode()?).await,
            Ok(frame) => {
                if log::log_enabled!(log::Level::Debug) {
                    log::debug!("Ignoring {:?} frame from client.", frame.frame_type());
                }
                Ok(())
            }
            Err(e) => {
                log::debug!("Ignoring message: {e}");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::BehaviorSubject;
    use serde::Serialize;
    use serde_json::json;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

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

    /// Records everything the adapter does with the session.
    #[derive(Clone, Default)]
    struct RecordingSession {
        sent: Arc<Mutex<Vec<Frame>>>,
        closed: Arc<Mutex<Option<ChannelCloseReason>>>,
    }

    impl RecordingSession {
        fn sent(&self) -> Vec<Frame> {
            self.sent.lock().unwrap().clone()
        }

        fn closed(&self) -> Option<ChannelCloseReason> {
            self.closed.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl ChannelSession for RecordingSession {
        async fn send_text(&mut self, text: String) -> Result<(), ObservableError> {
            self.sent.lock().unwrap().push(Frame::decode(&text)?);
            Ok(())
        }

        async fn close(self: Box<Self>, reason: ChannelCloseReason) {
            *self.closed.lock().unwrap() = Some(reason);
        }
    }

    fn peer_events() -> (mpsc::UnboundedSender<PeerEvent>, PeerEventStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });
        (tx, Box::pin(stream))
    }

    fn no_timeout() -> ChannelConfig {
        ChannelConfig::default().with_client_timeout(None)
    }

    #[tokio::test]
    async fn test_snapshots_in_order_then_completed() {
        initialize_env_logger();
        let source = ObservableSource::snapshots(futures::stream::iter(
            ["A", "B", "C"].map(Ok::<_, ObservableError>),
        ));
        let session = RecordingSession::default();
        let (_inbound_tx, inbound) = peer_events();
        let outcome = ObservableAdapter::new(source, &no_timeout())
            .start(Box::new(session.clone()), inbound)
            .join()
            .await;
        assert_eq!(outcome, AdapterOutcome::Completed);
        assert_eq!(
            session.sent(),
            vec![
                Frame::data(json!("A")),
                Frame::data(json!("B")),
                Frame::data(json!("C"))
            ]
        );
        assert_eq!(session.closed(), Some(ChannelCloseReason::Completed));
    }

    #[tokio::test]
    async fn test_subject_initial_value_and_disconnect() {
        initialize_env_logger();
        let subject = Arc::new(BehaviorSubject::new("Initial".to_string()));
        let source = ObservableSource::subject(&subject);
        let session = RecordingSession::default();
        let (inbound_tx, inbound) = peer_events();
        let handle = ObservableAdapter::new(source, &no_timeout())
            .start(Box::new(session.clone()), inbound);
        subject.next("Next".to_string());
        inbound_tx.send(PeerEvent::Text(Frame::ping(77).encode().unwrap())).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        inbound_tx.send(PeerEvent::Disconnected).unwrap();
        assert_eq!(handle.join().await, AdapterOutcome::PeerDisconnected);
        let sent = session.sent();
        let data = sent
            .iter()
            .filter(|frame| matches!(frame, Frame::Data { .. }))
            .cloned()
            .collect::<Vec<_>>();
        assert_eq!(
            data,
            vec![Frame::data(json!("Initial")), Frame::data(json!("Next"))]
        );
        assert!(sent.contains(&Frame::pong(77)));
        // Nothing is sent to a client that is gone
        assert_eq!(session.closed(), None);
        assert_eq!(subject.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_unserializable_value_is_dropped() {
        initialize_env_logger();
        struct Faulty(bool);
        impl Serialize for Faulty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                if self.0 {
                    Err(serde::ser::Error::custom("faulty"))
                } else {
                    serializer.serialize_str("fine")
                }
            }
        }
        let source = ObservableSource::snapshots(futures::stream::iter(
            [Faulty(false), Faulty(true), Faulty(false)].map(Ok::<_, ObservableError>),
        ));
        let session = RecordingSession::default();
        let (_inbound_tx, inbound) = peer_events();
        let outcome = ObservableAdapter::new(source, &no_timeout())
            .start(Box::new(session.clone()), inbound)
            .join()
            .await;
        assert_eq!(outcome, AdapterOutcome::Completed);
        assert_eq!(
            session.sent(),
            vec![Frame::data(json!("fine")), Frame::data(json!("fine"))]
        );
    }

    #[tokio::test]
    async fn test_source_failure_closes_without_data() {
        initialize_env_logger();
        let source = ObservableSource::snapshots(futures::stream::iter(vec![
            Ok(json!([1, 2])),
            Err(ObservableErrorKind::SourceFailure.error_with_msg("secret details")),
            Ok(json!([3])),
        ]));
        let session = RecordingSession::default();
        let (_inbound_tx, inbound) = peer_events();
        let outcome = ObservableAdapter::new(source, &no_timeout())
            .start(Box::new(session.clone()), inbound)
            .join()
            .await;
        assert!(matches!(outcome, AdapterOutcome::SourceFailed(_)));
        assert_eq!(session.sent(), vec![Frame::data(json!([1, 2]))]);
        assert_eq!(session.closed(), Some(ChannelCloseReason::SourceFailure));
    }

    #[tokio::test]
    async fn test_idle_timeout_and_stop() {
        initialize_env_logger();
        let subject = Arc::new(BehaviorSubject::new(0));
        let session = RecordingSession::default();
        let (_inbound_tx, inbound) = peer_events();
        let config = ChannelConfig::default().with_client_timeout(Some(Duration::from_millis(50)));
        let outcome = ObservableAdapter::new(ObservableSource::subject(&subject), &config)
            .start(Box::new(session.clone()), inbound)
            .join()
            .await;
        assert_eq!(outcome, AdapterOutcome::IdleTimeout);
        assert_eq!(session.closed(), Some(ChannelCloseReason::IdleTimeout));

        let session = RecordingSession::default();
        let (_inbound_tx, inbound) = peer_events();
        let handle = ObservableAdapter::new(ObservableSource::subject(&subject), &no_timeout())
            .start(Box::new(session.clone()), inbound);
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.stop();
        assert_eq!(handle.join().await, AdapterOutcome::Stopped);
        assert_eq!(session.closed(), Some(ChannelCloseReason::Stopped));
        assert_eq!(session.sent(), vec![Frame::data(json!(0))]);
        assert_eq!(subject.subscriber_count(), 0);
    }
}
