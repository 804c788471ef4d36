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

//! In-memory [Connector] with scripted behavior for tests.

use super::Connector;
use super::Transport;
use super::TransportEvent;
use crate::ObservableError;
use crate::ObservableErrorKind;
use crate::frame::Frame;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use tokio::sync::mpsc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;

/// Server side of an in-memory transport.
pub struct ScriptedPeer {
    /// Send events to the client.
    pub to_client: UnboundedSender<TransportEvent>,
    /// Frames sent by the client.
    pub from_client: UnboundedReceiver<String>,
}

impl ScriptedPeer {
    /// Send an encoded frame to the client.
    pub fn send(&self, frame: &Frame) {
        let _ = self
            .to_client
            .send(TransportEvent::Text(frame.encode().unwrap()));
    }

    /// Close the channel with the provided code.
    pub fn close(&self, code: u16) {
        let _ = self.to_client.send(TransportEvent::Closed {
            code: Some(code),
            reason: String::new(),
        });
    }

    /// Wait for the next decodable frame from the client.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        self.from_client
            .recv()
            .await
            .map(|text| Frame::decode(&text).unwrap())
    }
}

/// Outcome of a single connect attempt.
pub enum Script {
    /// Fail with the provided error.
    Fail(ObservableError),
    /// Succeed and hand the server side to the test.
    Accept(mpsc::UnboundedSender<ScriptedPeer>),
    /// Never complete the connect.
    Hang,
}

/// [Connector] that follows a script of connect outcomes.
///
/// Once the script is exhausted every attempt fails with a transport error.
#[derive(Default)]
pub struct ScriptedConnector {
    script: Mutex<VecDeque<Script>>,
    attempts: AtomicUsize,
}

impl ScriptedConnector {
    /// Return a new instance.
    pub fn new(script: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            attempts: AtomicUsize::default(),
        })
    }

    /// Number of connect attempts so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Return a script entry that accepts the connection and a receiver of
    /// the resulting [ScriptedPeer].
    pub fn accept() -> (Script, UnboundedReceiver<ScriptedPeer>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Script::Accept(tx), rx)
    }
}

#[async_trait::async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, url: &str) -> Result<Transport, ObservableError> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Script::Accept(peer_tx)) => {
                let (to_client, client_rx) = mpsc::unbounded_channel();
                let (client_tx, from_client) = mpsc::unbounded_channel::<String>();
                let _ = peer_tx.send(ScriptedPeer {
                    to_client,
                    from_client,
                });
                let sink = futures::sink::unfold(client_tx, |client_tx, text: String| async move {
                    client_tx.send(text).map_err(|_| {
                        ObservableErrorKind::TransportError.error_with_msg("peer is gone")
                    })?;
                    Ok::<_, ObservableError>(client_tx)
                });
                let events = futures::stream::unfold(client_rx, |mut client_rx| async move {
                    client_rx.recv().await.map(|event| (event, client_rx))
                });
                Ok(Transport {
                    sink: Box::pin(sink),
                    events: Box::pin(events),
                })
            }
            Some(Script::Fail(e)) => Err(e),
            Some(Script::Hang) => futures::future::pending().await,
            None => Err(ObservableErrorKind::TransportError
                .error_with_msg(format!("Connection to '{url}' refused."))),
        }
    }
}
