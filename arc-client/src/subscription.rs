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

//! Typed subscriptions of query values.

mod observer_slot;
mod query_observer;
mod subscription_handle;

use self::observer_slot::ObserverSlot;
use self::observer_slot::TypedObserverSlot;
pub(crate) use self::query_observer::FnObserver;
pub use self::query_observer::QueryObserver;
pub use self::subscription_handle::SubscriptionHandle;
use crate::connection::SubscriberEvent;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// Start delivering events from `event_rx` to `observer` in a background task.
///
/// Return the slot used to stop further observer calls.
pub(crate) fn spawn_dispatch<T>(
    subscription_id: u64,
    mut event_rx: UnboundedReceiver<SubscriberEvent>,
    observer: Box<dyn QueryObserver<T>>,
) -> Arc<dyn ObserverSlot>
where
    T: DeserializeOwned + Send + 'static,
{
    let observer_slot = Arc::new(TypedObserverSlot::new(subscription_id, observer));
    let observer_slot_clone = Arc::clone(&observer_slot);
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if !observer_slot_clone.deliver(event).await {
                break;
            }
        }
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("Dispatch of subscription {subscription_id} ended.");
        }
    });
    observer_slot
}
