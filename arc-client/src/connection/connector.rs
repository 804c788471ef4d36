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

//! Transport abstraction used by a [super::Connection].

use crate::ObservableError;
use futures::Sink;
use futures::Stream;
use std::pin::Pin;

/// Outbound half of a transport accepting encoded frames.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = ObservableError> + Send>>;

/// Inbound half of a transport.
///
/// The end of the stream means that the transport was lost.
pub type TransportEventStream = Pin<Box<dyn Stream<Item = TransportEvent> + Send>>;

/// Inbound transport event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// An encoded frame.
    Text(String),
    /// The peer closed the channel.
    Closed {
        /// Close status code when provided by the peer.
        code: Option<u16>,
        /// Close reason.
        reason: String,
    },
    /// Socket level failure.
    Failed(ObservableError),
}

impl TransportEvent {
    /// Close code used when the query's source completed.
    pub const CLOSE_COMPLETED: u16 = 1000;
    /// Close code used when the query's source failed.
    pub const CLOSE_SOURCE_FAILURE: u16 = 1011;
}

/// An established transport, split into its outbound and inbound halves.
///
/// Every (re-)connect yields a fresh [Transport].
pub struct Transport {
    /// Outbound frames.
    pub sink: FrameSink,
    /// Inbound events.
    pub events: TransportEventStream,
}

/// Factory of transports to a query endpoint.
#[async_trait::async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Establish a new transport to `url`.
    ///
    /// Failures that will not go away by retrying, like an unknown query,
    /// must be reported with a kind where
    /// [ObservableError::is_retryable()] is `false`.
    async fn connect(&self, url: &str) -> Result<Transport, ObservableError>;
}
