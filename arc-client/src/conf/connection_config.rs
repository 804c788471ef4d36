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

//! Configuration of a single [crate::Connection].

use super::ReconnectPolicy;
use std::time::Duration;

/// Configuration of a single [crate::Connection].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    ping_interval: Duration,
    reconnect_policy: ReconnectPolicy,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            ping_interval: Self::DEFAULT_PING_INTERVAL,
            reconnect_policy: ReconnectPolicy::default(),
        }
    }
}

impl ConnectionConfig {
    /// Interval between heartbeat pings in production.
    pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(5);

    /// Return a copy with a different heartbeat interval.
    pub fn with_ping_interval(mut self, ping_interval: Duration) -> Self {
        self.ping_interval = ping_interval;
        self
    }

    /// Return a copy with a different [ReconnectPolicy].
    pub fn with_reconnect_policy(mut self, reconnect_policy: ReconnectPolicy) -> Self {
        self.reconnect_policy = reconnect_policy;
        self
    }

    /// Interval between heartbeat pings.
    pub fn ping_interval(&self) -> Duration {
        self.ping_interval
    }

    /// Strategy for re-establishing a lost transport.
    pub fn reconnect_policy(&self) -> &ReconnectPolicy {
        &self.reconnect_policy
    }
}
