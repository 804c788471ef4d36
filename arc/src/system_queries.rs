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

//! Built-in system queries.

use arc_client::time::get_timestamp_millis;
use arc_core::ObservableError;
use arc_core::ObservableErrorKind;
use arc_core::observable::BehaviorSubject;
use arc_core::query::QueryRegistry;
use std::sync::Arc;
use std::time::Duration;

/// Default number of values of the counter query.
const DEFAULT_COUNT: u64 = 10;

/// Register the system queries and start the tasks feeding them.
pub fn register_system_queries(registry: &QueryRegistry, tick: Duration) {
    let clock = Arc::new(BehaviorSubject::new(get_timestamp_millis()));
    let clock_clone = Arc::clone(&clock);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick);
        loop {
            interval.tick().await;
            clock_clone.next(get_timestamp_millis());
        }
    });
    registry.register_subject("system/clock", "/system/clock", move |_request| {
        Ok(Arc::clone(&clock))
    });
    registry.register_snapshots("system/counter", "/system/counter/{start}", move |request| {
        let start = parse_argument(request.argument("start"), "start")?.unwrap_or_default();
        let count = parse_argument(request.argument("count"), "count")?.unwrap_or(DEFAULT_COUNT);
        Ok(counter_snapshots(start, count, tick))
    });
}

fn parse_argument(value: Option<&str>, name: &str) -> Result<Option<u64>, ObservableError> {
    value
        .map(|value| {
            value.parse::<u64>().map_err(|e| {
                ObservableErrorKind::InvalidArguments
                    .error_with_msg(format!("Bad '{name}' argument '{value}': {e}"))
            })
        })
        .transpose()
}

/// Every emission is the full list counted so far.
fn counter_snapshots(
    start: u64,
    count: u64,
    tick: Duration,
) -> impl futures::Stream<Item = Result<Vec<u64>, ObservableError>> + Send + 'static {
    let end = start.saturating_add(count);
    futures::stream::unfold(start, move |next| async move {
        if next >= end {
            return None;
        }
        if next > start {
            tokio::time::sleep(tick).await;
        }
        Some((Ok((start..=next).collect()), next + 1))
    })
}
