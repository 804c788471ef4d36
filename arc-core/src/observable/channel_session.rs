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

//! Transport session contract of the server side of a channel.

use arc_client::ObservableError;
use futures::Stream;
use std::pin::Pin;

/// Reason for closing a channel from the server side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCloseReason {
    /// The source completed.
    Completed,
    /// The source failed. The details are only logged.
    SourceFailure,
    /// No message from the client within the configured timeout.
    IdleTimeout,
    /// The server stopped the channel.
    Stopped,
}

impl ChannelCloseReason {
    /// WebSocket close code sent to the client.
    ///
    /// Clients complete on `1000`, fail on `1011` and reconnect on anything
    /// else.
    pub fn code(&self) -> u16 {
        match self {
            Self::Completed => 1000,
            Self::SourceFailure => 1011,
            Self::IdleTimeout | Self::Stopped => 1001,
        }
    }

    /// Short human readable description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::SourceFailure => "source failure",
            Self::IdleTimeout => "client timeout",
            Self::Stopped => "stopped",
        }
    }
}

/// Inbound event of a channel session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    /// Text message from the client.
    Text(String),
    /// The client closed the channel or the transport failed.
    Disconnected,
}

/// Stream of inbound events. The end of the stream means disconnected.
pub type PeerEventStream = Pin<Box<dyn Stream<Item = PeerEvent> + Send>>;

/// Outbound side of an established channel.
///
/// The transport lifecycle is owned by the caller. The adapter only sends
/// frames and asks for the channel to be closed.
#[async_trait::async_trait]
pub trait ChannelSession: Send {
    /// Send a text message to the client.
    async fn send_text(&mut self, text: String) -> Result<(), ObservableError>;

    /// Close the channel.
    async fn close(self: Box<Self>, reason: ChannelCloseReason);
}
