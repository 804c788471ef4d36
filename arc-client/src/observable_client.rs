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

//! Client for subscribing to observable queries.

mod connection_pool;

pub(crate) use self::connection_pool::ConnectionPool;
use crate::ObservableError;
use crate::conf::ClientConfig;
use crate::connection::Connector;
use crate::connection::WebSocketConnector;
use crate::endpoint::QueryArguments;
use crate::endpoint::QueryEndpoint;
use crate::endpoint::RouteTemplate;
use crate::subscription;
use crate::subscription::FnObserver;
use crate::subscription::QueryObserver;
use crate::subscription::SubscriptionHandle;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use tokio::sync::mpsc;

/// Client for subscribing to observable queries of a server.
///
/// Each subscription gets a connection of its own unless
/// [ClientConfig::with_multiplexing] is enabled, in which case subscriptions
/// to the same endpoint share a connection.
pub struct ObservableClient {
    config: ClientConfig,
    pool: Arc<ConnectionPool>,
    next_subscription_id: AtomicU64,
}

impl ObservableClient {
    /// Return a new instance that connects using WebSockets.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_connector(config, Arc::new(WebSocketConnector::default()))
    }

    /// Return a new instance that connects using the provided [Connector].
    pub fn with_connector(config: ClientConfig, connector: Arc<dyn Connector>) -> Self {
        let pool = ConnectionPool::new(
            config.connection().clone(),
            config.is_multiplexing(),
            connector,
        );
        Self {
            config,
            pool,
            next_subscription_id: AtomicU64::new(1),
        }
    }

    /// Client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Resolve the endpoint of the query at `route_template` with
    /// `arguments`.
    pub fn endpoint(
        &self,
        route_template: &str,
        arguments: &QueryArguments,
    ) -> Result<QueryEndpoint, ObservableError> {
        QueryEndpoint::resolve(
            &self.config,
            &RouteTemplate::parse(route_template),
            arguments,
        )
    }

    /// Subscribe to the query at `route_template`.
    ///
    /// The subscription is registered right away. Values that arrive before
    /// the connection is open are queued and delivered in order.
    pub async fn subscribe<T, O>(
        &self,
        route_template: &str,
        arguments: &QueryArguments,
        observer: O,
    ) -> Result<SubscriptionHandle, ObservableError>
    where
        T: DeserializeOwned + Send + 'static,
        O: QueryObserver<T>,
    {
        let endpoint = self.endpoint(route_template, arguments)?;
        let subscription_id = self.next_subscription_id.fetch_add(1, Ordering::Relaxed);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let observer_slot =
            subscription::spawn_dispatch::<T>(subscription_id, event_rx, Box::new(observer));
        let connection = self
            .pool
            .acquire(endpoint, subscription_id, event_tx)
            .await;
        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "Subscription {subscription_id} to '{}' uses connection {}.",
                connection.endpoint(),
                connection.id()
            );
        }
        Ok(SubscriptionHandle::new(
            subscription_id,
            connection,
            observer_slot,
            Arc::clone(&self.pool),
        ))
    }

    /// Subscribe using closures.
    ///
    /// `on_end` is invoked once with `None` on completion or with the error
    /// that ended the subscription.
    pub async fn subscribe_with<T, N, E>(
        &self,
        route_template: &str,
        arguments: &QueryArguments,
        on_next: N,
        on_end: E,
    ) -> Result<SubscriptionHandle, ObservableError>
    where
        T: DeserializeOwned + Send + 'static,
        N: Fn(T) + Send + Sync + 'static,
        E: Fn(Option<ObservableError>) + Send + Sync + 'static,
    {
        self.subscribe(route_template, arguments, FnObserver::new(on_next, on_end))
            .await
    }

    /// Number of connections that are neither closing nor closed.
    pub async fn active_connections(&self) -> usize {
        self.pool.active_connections().await
    }

    /// Close all connections of this client.
    ///
    /// Observers of remaining subscriptions are signaled completion.
    pub async fn close(&self) {
        self.pool.close_all().await;
    }
}
