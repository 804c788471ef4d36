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

//! Events queued for the subscribers of a connection.

use crate::ObservableError;
use serde_json::Value;

/// Event queued for a single subscriber of a [super::Connection].
///
/// Dispatch to the subscriber's observer happens outside the receive loop.
#[derive(Debug, Clone)]
pub enum SubscriberEvent {
    /// Payload of a data frame.
    Next(Value),
    /// The server completed the query. Terminal.
    Completed,
    /// The subscription failed permanently. Terminal.
    Failed(ObservableError),
}
