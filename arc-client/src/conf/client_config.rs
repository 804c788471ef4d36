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

//! Configuration of an [crate::ObservableClient].

use super::ConnectionConfig;

/// Configuration of an [crate::ObservableClient].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    origin: String,
    base_path: String,
    source_id: Option<String>,
    connection: ConnectionConfig,
    multiplex: bool,
}

impl ClientConfig {
    /// API base path used when none is configured.
    pub const DEFAULT_BASE_PATH: &str = "/api";

    /// Return a new instance for the server at `origin` like
    /// `http://localhost:8080`.
    pub fn new(origin: &str) -> Self {
        Self {
            origin: origin.trim_end_matches('/').to_owned(),
            base_path: Self::DEFAULT_BASE_PATH.to_owned(),
            source_id: None,
            connection: ConnectionConfig::default(),
            multiplex: false,
        }
    }

    /// Return a copy with a different API base path.
    pub fn with_base_path(mut self, base_path: &str) -> Self {
        self.base_path = base_path.to_owned();
        self
    }

    /// Return a copy that identifies the logical source (tenant or
    /// microservice) of the subscriptions.
    pub fn with_source_id(mut self, source_id: &str) -> Self {
        self.source_id = Some(source_id.to_owned());
        self
    }

    /// Return a copy with a different [ConnectionConfig].
    pub fn with_connection(mut self, connection: ConnectionConfig) -> Self {
        self.connection = connection;
        self
    }

    /// Return a copy where subscriptions to the same endpoint share a single
    /// connection.
    pub fn with_multiplexing(mut self, multiplex: bool) -> Self {
        self.multiplex = multiplex;
        self
    }

    /// Server origin without trailing slash.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// API base path.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Logical source identifier sent with every subscription.
    pub fn source_id(&self) -> Option<&str> {
        self.source_id.as_deref()
    }

    /// Per connection configuration.
    pub fn connection(&self) -> &ConnectionConfig {
        &self.connection
    }

    /// `true` if subscriptions to the same endpoint share one connection.
    pub fn is_multiplexing(&self) -> bool {
        self.multiplex
    }
}
