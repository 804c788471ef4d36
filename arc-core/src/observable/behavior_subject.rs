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

//! Push source with behavior semantics.

use arc_client::ObservableError;
use futures::Stream;
use std::sync::Mutex;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// Event of a [BehaviorSubject] as seen by a subscriber.
#[derive(Debug, Clone)]
enum SubjectEvent<T> {
    Next(T),
    Completed,
    Failed(ObservableError),
}

struct SubjectState<T> {
    current: T,
    terminal: Option<SubjectEvent<T>>,
}

/// Subject holding a current value.
///
/// New subscribers immediately receive the current value and then every
/// subsequent value. A subscriber that falls more than the channel capacity
/// behind skips the values it missed and continues with newer ones.
pub struct BehaviorSubject<T> {
    state: Mutex<SubjectState<T>>,
    event_tx: broadcast::Sender<SubjectEvent<T>>,
}

impl<T: Clone + Send + 'static> BehaviorSubject<T> {
    /// Number of values buffered per subscriber.
    const CHANNEL_CAPACITY: usize = 64;

    /// Return a new instance holding `initial`.
    pub fn new(initial: T) -> Self {
        let (event_tx, _event_rx) = broadcast::channel(Self::CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(SubjectState {
                current: initial,
                terminal: None,
            }),
            event_tx,
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SubjectState<T>> {
        // The state is always consistent, so recover from poisoning
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current value.
    pub fn current(&self) -> T {
        self.lock_state().current.clone()
    }

    /// Emit a new value.
    ///
    /// Ignored once the subject is completed or failed.
    pub fn next(&self, value: T) {
        let mut state = self.lock_state();
        if state.terminal.is_some() {
            return;
        }
        state.current = value.clone();
        // No receivers is fine
        let _ = self.event_tx.send(SubjectEvent::Next(value));
    }

    /// Complete the subject.
    pub fn complete(&self) {
        self.terminate(SubjectEvent::Completed);
    }

    /// Fail the subject.
    pub fn fail(&self, error: ObservableError) {
        self.terminate(SubjectEvent::Failed(error));
    }

    fn terminate(&self, event: SubjectEvent<T>) {
        let mut state = self.lock_state();
        if state.terminal.is_none() {
            state.terminal = Some(event.clone());
            let _ = self.event_tx.send(event);
        }
    }

    /// Return `true` if the subject has completed or failed.
    pub fn is_terminated(&self) -> bool {
        self.lock_state().terminal.is_some()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.event_tx.receiver_count()
    }

    /// Subscribe to the current and all subsequent values.
    ///
    /// The stream ends after completion and yields an error and ends on
    /// failure. Dropping the stream unsubscribes.
    pub fn subscribe(&self) -> impl Stream<Item = Result<T, ObservableError>> + Send + use<T> {
        let (first, event_rx) = {
            let state = self.lock_state();
            let first = match &state.terminal {
                None | Some(SubjectEvent::Next(_)) => SubjectEvent::Next(state.current.clone()),
                Some(terminal) => terminal.clone(),
            };
            (first, self.event_tx.subscribe())
        };
        futures::stream::unfold(
            (Some(first), Some(event_rx)),
            |(pending, event_rx)| async move {
                let mut event_rx = event_rx?;
                let event = match pending {
                    Some(event) => event,
                    None => loop {
                        match event_rx.recv().await {
                            Ok(event) => break event,
                            Err(RecvError::Lagged(skipped)) => {
                                log::debug!("Subscriber skipped {skipped} values.");
                            }
                            Err(RecvError::Closed) => return None,
                        }
                    },
                };
                match event {
                    SubjectEvent::Next(value) => Some((Ok(value), (None, Some(event_rx)))),
                    SubjectEvent::Completed => None,
                    SubjectEvent::Failed(e) => Some((Err(e), (None, None))),
                }
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arc_client::ObservableErrorKind;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_current_value_first() {
        let subject = BehaviorSubject::new("Initial".to_string());
        let mut values = Box::pin(subject.subscribe());
        assert_eq!(subject.subscriber_count(), 1);
        subject.next("Second".to_string());
        assert_eq!(values.next().await.unwrap().unwrap(), "Initial");
        assert_eq!(values.next().await.unwrap().unwrap(), "Second");
        subject.complete();
        assert!(values.next().await.is_none());
        drop(values);
        assert_eq!(subject.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_late_subscriber_gets_latest() {
        let subject = BehaviorSubject::new(1);
        subject.next(2);
        subject.next(3);
        let mut values = Box::pin(subject.subscribe());
        assert_eq!(values.next().await.unwrap().unwrap(), 3);
        assert_eq!(subject.current(), 3);
    }

    #[tokio::test]
    async fn test_failure_ends_stream() {
        let subject = BehaviorSubject::new(1);
        let mut values = Box::pin(subject.subscribe());
        subject.fail(ObservableErrorKind::SourceFailure.error_with_msg("broken"));
        subject.next(2);
        assert_eq!(values.next().await.unwrap().unwrap(), 1);
        assert!(values.next().await.unwrap().is_err());
        assert!(values.next().await.is_none());
        // Subscribing after termination only yields the terminal event
        let mut late = Box::pin(subject.subscribe());
        assert!(late.next().await.unwrap().is_err());
        assert!(subject.is_terminated());
    }
}
