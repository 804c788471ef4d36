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

//! Lifecycle states of a [super::Connection].

use std::fmt;

/// Lifecycle state of a [super::Connection].
///
/// ```text
/// Connecting ──> Open ──> Reconnecting ──> Open
///      │           │            │
///      └───────────┴────────────┴──> Closing ──> Closed
/// ```
///
/// [ConnectionState::Closed] is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Initial connect attempt is in progress.
    Connecting,
    /// Transport is established and frames flow.
    Open,
    /// Explicit close was requested.
    Closing,
    /// No further frames will be sent or received.
    Closed,
    /// Transport was lost and is being re-established.
    Reconnecting,
}

impl ConnectionState {
    /// Return `true` for [Self::Closing] and [Self::Closed].
    pub fn is_closing_or_closed(&self) -> bool {
        matches!(self, Self::Closing | Self::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
