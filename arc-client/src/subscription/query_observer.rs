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

//! Typed observer of query values.

use crate::ObservableError;
use std::marker::PhantomData;

/// Receiver of the values of a query subscription.
///
/// Calls for a single subscription never overlap and happen in the order the
/// values were received. After [Self::on_completed] or [Self::on_error] no
/// further calls are made.
pub trait QueryObserver<T>: Send + Sync + 'static {
    /// A new value of the query.
    fn on_next(&self, value: T);

    /// The server completed the query.
    fn on_completed(&self) {}

    /// The subscription failed permanently.
    fn on_error(&self, error: ObservableError) {
        log::info!("Subscription failed: {error}");
    }
}

/// Adapts a pair of closures into a [QueryObserver].
pub(crate) struct FnObserver<T, N, E> {
    on_next: N,
    on_end: E,
    phantom_data: PhantomData<fn(T)>,
}

impl<T, N, E> FnObserver<T, N, E>
where
    N: Fn(T) + Send + Sync + 'static,
    E: Fn(Option<ObservableError>) + Send + Sync + 'static,
{
    /// Return a new instance.
    ///
    /// `on_end` is called with `None` on completion.
    pub fn new(on_next: N, on_end: E) -> Self {
        Self {
            on_next,
            on_end,
            phantom_data: PhantomData,
        }
    }
}

impl<T, N, E> QueryObserver<T> for FnObserver<T, N, E>
where
    T: 'static,
    N: Fn(T) + Send + Sync + 'static,
    E: Fn(Option<ObservableError>) + Send + Sync + 'static,
{
    fn on_next(&self, value: T) {
        (self.on_next)(value)
    }

    fn on_completed(&self) {
        (self.on_end)(None)
    }

    fn on_error(&self, error: ObservableError) {
        (self.on_end)(Some(error))
    }
}
