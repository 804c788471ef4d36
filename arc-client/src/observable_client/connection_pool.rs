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

//! Connections of an [super::ObservableClient].

use crate::conf::ConnectionConfig;
use crate::connection::Connection;
use crate::connection::Connector;
use crate::connection::SubscriberEvent;
use crate::endpoint::QueryEndpoint;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use tokio::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;

/// Keeps track of open connections and shares them per endpoint when
/// multiplexing is enabled.
pub(crate) struct ConnectionPool {
    connection_config: ConnectionConfig,
    multiplexing: bool,
    connector: Arc<dyn Connector>,
    next_connection_id: AtomicU64,
    connections: Mutex<HashMap<u64, Arc<Connection>>>,
}

impl ConnectionPool {
    /// Return a new instance.
    pub fn new(
        connection_config: ConnectionConfig,
        multiplexing: bool,
        connector: Arc<dyn Connector>,
    ) -> Arc<Self> {
        Arc::new(Self {
            connection_config,
            multiplexing,
            connector,
            next_connection_id: AtomicU64::new(1),
            connections: Mutex::default(),
        })
    }

    /// Attach the subscriber to a connection to `endpoint`.
    pub async fn acquire(
        &self,
        endpoint: QueryEndpoint,
        subscription_id: u64,
        event_tx: UnboundedSender<SubscriberEvent>,
    ) -> Arc<Connection> {
        let mut connections = self.connections.lock().await;
        // Connections that ended on their own are no longer useful
        connections.retain(|_, connection| !connection.state().is_closing_or_closed());
        if self.multiplexing
            && let Some(connection) = connections
                .values()
                .find(|connection| connection.endpoint().eq(&endpoint))
        {
            connection.attach(subscription_id, event_tx);
            return Arc::clone(connection);
        }
        let connection_id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        let connection = Connection::open(
            connection_id,
            endpoint,
            self.connection_config.clone(),
            Arc::clone(&self.connector),
        );
        connection.attach(subscription_id, event_tx);
        connections.insert(connection_id, Arc::clone(&connection));
        connection
    }

    /// Detach the subscriber and close the connection if it was the last
    /// one.
    pub async fn release(&self, connection: &Arc<Connection>, subscription_id: u64) {
        let mut connections = self.connections.lock().await;
        if connection.detach(subscription_id) == 0 {
            connection.close();
            connections.remove(&connection.id());
        }
    }

    /// Number of connections that are neither closing nor closed.
    pub async fn active_connections(&self) -> usize {
        self.connections
            .lock()
            .await
            .values()
            .filter(|connection| !connection.state().is_closing_or_closed())
            .count()
    }

    /// Close all connections.
    pub async fn close_all(&self) {
        let mut connections = self.connections.lock().await;
        for (_, connection) in connections.drain() {
            connection.close();
        }
    }
}
