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

//! Type erased slot holding the observer of a subscription.

use super::QueryObserver;
use crate::connection::SubscriberEvent;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

/// Allows the [super::SubscriptionHandle] to stop observer calls without
/// knowing the value type.
#[async_trait::async_trait]
pub(crate) trait ObserverSlot: Send + Sync {
    /// Remove the observer.
    ///
    /// When this returns, no observer call is in progress and none will
    /// follow.
    async fn clear(&self);
}

/// Holds the observer while the subscription is active.
pub(crate) struct TypedObserverSlot<T> {
    subscription_id: u64,
    observer: Mutex<Option<Box<dyn QueryObserver<T>>>>,
}

impl<T: DeserializeOwned + Send + 'static> TypedObserverSlot<T> {
    /// Return a new instance.
    pub fn new(subscription_id: u64, observer: Box<dyn QueryObserver<T>>) -> Self {
        Self {
            subscription_id,
            observer: Mutex::new(Some(observer)),
        }
    }

    /// Deliver an event to the observer.
    ///
    /// Return `false` when no further events should be delivered.
    pub async fn deliver(&self, event: SubscriberEvent) -> bool {
        let mut observer_guard = self.observer.lock().await;
        let Some(observer) = observer_guard.as_ref() else {
            return false;
        };
        match event {
            SubscriberEvent::Next(value) => {
                match serde_json::from_value::<T>(value) {
                    Ok(value) => observer.on_next(value),
                    Err(e) => {
                        log::debug!(
                            "Subscription {} dropped value that could not be parsed: {e}",
                            self.subscription_id
                        );
                    }
                }
                true
            }
            SubscriberEvent::Completed => {
                if let Some(observer) = observer_guard.take() {
                    observer.on_completed();
                }
                false
            }
            SubscriberEvent::Failed(e) => {
                if let Some(observer) = observer_guard.take() {
                    observer.on_error(e);
                }
                false
            }
        }
    }
}

#[async_trait::async_trait]
impl<T: Send + 'static> ObserverSlot for TypedObserverSlot<T> {
    async fn clear(&self) {
        self.observer.lock().await.take();
    }
}
