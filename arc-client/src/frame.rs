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

/*! Wire format of the frames exchanged on an observable query channel.

Every WebSocket text message carries exactly one JSON encoded [Frame]:

```text
{ "type": "Ping", "timestamp": <int64 ms epoch> }
{ "type": "Pong", "timestamp": <int64 ms epoch> }
{ "type": "Data", "data": <any> }
```

Ping and Pong never carry `data` and Data never carries `timestamp`. This is
enforced by the shape of [Frame] itself.
*/

use crate::ObservableError;
use crate::ObservableErrorKind;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Discriminator of a [Frame].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    /// Heartbeat request.
    Ping,
    /// Heartbeat response.
    Pong,
    /// Query result.
    Data,
}

/// One discrete message unit exchanged over the channel.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum Frame {
    /// Heartbeat request carrying the sender's clock in epoch milliseconds.
    Ping {
        /// Epoch milliseconds when the ping was sent.
        timestamp: i64,
    },
    /// Heartbeat response echoing the timestamp of the [Frame::Ping].
    Pong {
        /// Timestamp of the ping this responds to.
        timestamp: i64,
    },
    /// A complete query result.
    ///
    /// A `null` payload is omitted on the wire and an absent payload decodes
    /// as `null`.
    Data {
        /// The result payload.
        #[serde(default, skip_serializing_if = "Value::is_null")]
        data: Value,
    },
}

impl Frame {
    /// Return a new heartbeat request.
    pub fn ping(timestamp: i64) -> Self {
        Self::Ping { timestamp }
    }

    /// Return a new heartbeat response.
    pub fn pong(timestamp: i64) -> Self {
        Self::Pong { timestamp }
    }

    /// Return a new data frame with an already encoded payload.
    pub fn data(data: Value) -> Self {
        Self::Data { data }
    }

    /// Return a new data frame from a serializable payload.
    pub fn data_from<T: Serialize + ?Sized>(payload: &T) -> Result<Self, ObservableError> {
        serde_json::to_value(payload)
            .map(Self::data)
            .map_err(|e| {
                ObservableErrorKind::MalformedMessage
                    .error_with_msg(format!("Unable to serialize payload: {e}"))
            })
    }

    /// Return the discriminator of this frame.
    pub fn frame_type(&self) -> FrameType {
        match self {
            Self::Ping { .. } => FrameType::Ping,
            Self::Pong { .. } => FrameType::Pong,
            Self::Data { .. } => FrameType::Data,
        }
    }

    /// Return the wire representation of this frame.
    pub fn encode(&self) -> Result<String, ObservableError> {
        serde_json::to_string(self).map_err(|e| {
            ObservableErrorKind::MalformedMessage
                .error_with_msg(format!("Unable to encode frame: {e}"))
        })
    }

    /// Parse the wire representation of a frame.
    pub fn decode(text: &str) -> Result<Self, ObservableError> {
        serde_json::from_str(text).map_err(|e| {
            ObservableErrorKind::MalformedMessage
                .error_with_msg(format!("Unable to decode frame: {e}"))
        })
    }

    /// Parse the wire representation of a frame from raw bytes.
    pub fn decode_bytes(bytes: &[u8]) -> Result<Self, ObservableError> {
        serde_json::from_slice(bytes).map_err(|e| {
            ObservableErrorKind::MalformedMessage
                .error_with_msg(format!("Unable to decode frame: {e}"))
        })
    }

    /// Parse the payload of a data frame as `T`.
    ///
    /// Heartbeat frames and payloads of another shape are reported as
    /// [ObservableErrorKind::MalformedMessage].
    pub fn parse_data<T: DeserializeOwned>(self) -> Result<T, ObservableError> {
        match self {
            Self::Data { data } => serde_json::from_value(data).map_err(|e| {
                ObservableErrorKind::MalformedMessage
                    .error_with_msg(format!("Unexpected payload: {e}"))
            }),
            other => Err(ObservableErrorKind::MalformedMessage
                .error_with_msg(format!("{:?} frame has no payload.", other.frame_type()))),
        }
    }
}
