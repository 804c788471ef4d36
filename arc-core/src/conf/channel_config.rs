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

//! Parsing of configuration for observable query channels.

use config::ConfigBuilder;
use config::builder::BuilderState;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::AppConfigDefaults;

/// Configuration of observable query channels.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelConfig {
    /// See [Self::client_timeout()].
    clienttimeoutmillis: u64,
    /// See [Self::max_frame_bytes()].
    maxframebytes: usize,
}

impl AppConfigDefaults for ChannelConfig {
    /// Provide defaults for this part of the configuration
    fn set_defaults<T: BuilderState>(
        config_builder: ConfigBuilder<T>,
        prefix: &str,
    ) -> ConfigBuilder<T> {
        config_builder
            .set_default(prefix.to_string() + "." + "clienttimeoutmillis", "15000")
            .unwrap()
            .set_default(prefix.to_string() + "." + "maxframebytes", "1048576")
            .unwrap()
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            clienttimeoutmillis: 15_000,
            maxframebytes: 1_048_576,
        }
    }
}

impl ChannelConfig {
    /// Return a copy with a different client timeout. `None` disables it.
    pub fn with_client_timeout(mut self, client_timeout: Option<Duration>) -> Self {
        self.clienttimeoutmillis = client_timeout
            .map(|timeout| u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        self
    }

    /// A channel is closed when nothing has been received from the client
    /// for this long.
    ///
    /// Clients send heartbeat pings, so a silent client is considered gone.
    /// `None` when disabled with `0`.
    pub fn client_timeout(&self) -> Option<Duration> {
        (self.clienttimeoutmillis > 0).then(|| Duration::from_millis(self.clienttimeoutmillis))
    }

    /// Largest inbound message after aggregation of continuation frames.
    pub fn max_frame_bytes(&self) -> usize {
        self.maxframebytes
    }
}
