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

//! Handle of an active subscription.

use super::ObserverSlot;
use crate::connection::Connection;
use crate::connection::ConnectionState;
use crate::endpoint::QueryEndpoint;
use crate::observable_client::ConnectionPool;
use std::sync::Arc;
use std::time::Duration;

/// Handle of an active query subscription.
///
/// Dropping the handle without calling [Self::unsubscribe] keeps the
/// subscription alive until the server ends it or the client is closed.
pub struct SubscriptionHandle {
    id: u64,
    connection: Arc<Connection>,
    observer_slot: Arc<dyn ObserverSlot>,
    pool: Arc<ConnectionPool>,
}

impl SubscriptionHandle {
    pub(crate) fn new(
        id: u64,
        connection: Arc<Connection>,
        observer_slot: Arc<dyn ObserverSlot>,
        pool: Arc<ConnectionPool>,
    ) -> Self {
        Self {
            id,
            connection,
            observer_slot,
            pool,
        }
    }

    /// Locally unique identifier of the subscription.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Endpoint of the subscribed query.
    pub fn endpoint(&self) -> &QueryEndpoint {
        self.connection.endpoint()
    }

    /// URL of the subscribed query.
    pub fn url(&self) -> &str {
        self.connection.endpoint().url()
    }

    /// State of the underlying connection.
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// See [Connection::last_ping_latency].
    pub fn last_ping_latency(&self) -> Duration {
        self.connection.last_ping_latency()
    }

    /// See [Connection::average_latency].
    pub fn average_latency(&self) -> Duration {
        self.connection.average_latency()
    }

    /// See [Connection::latency_samples].
    pub fn latency_samples(&self) -> u64 {
        self.connection.latency_samples()
    }

    /// End the subscription.
    ///
    /// No observer call happens after this returns. The connection is closed
    /// when this was its last subscriber.
    pub async fn unsubscribe(self) {
        self.observer_slot.clear().await;
        self.pool.release(&self.connection, self.id).await;
        if log::log_enabled!(log::Level::Debug) {
            log::debug!("Unsubscribed {} from '{}'.", self.id, self.endpoint());
        }
    }
}
