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

//! Registry of named queries.

use super::QueryPerformer;
use super::QueryRequest;
use super::SnapshotsPerformer;
use super::SubjectPerformer;
use crate::observable::BehaviorSubject;
use arc_client::ObservableError;
use arc_client::ObservableErrorKind;
use arc_client::QueryArguments;
use arc_client::endpoint::RouteTemplate;
use crossbeam_skiplist::SkipMap;
use futures::Stream;
use serde::Serialize;
use std::sync::Arc;

/// A named query with its route.
pub struct RegisteredQuery {
    name: String,
    route: RouteTemplate,
    performer: Arc<dyn QueryPerformer>,
}

impl RegisteredQuery {
    /// Name of the query.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Route of the query relative to the API base path.
    pub fn route(&self) -> &RouteTemplate {
        &self.route
    }

    /// Producer of the query's sources.
    pub fn performer(&self) -> &Arc<dyn QueryPerformer> {
        &self.performer
    }
}

/// Finds the query answering a request.
pub trait QueryResolver: Send + Sync {
    /// Return the query with the fully qualified name.
    fn resolve(&self, query_name: &str) -> Result<Arc<RegisteredQuery>, ObservableError>;

    /// Return the query whose route matches `path` and the route arguments.
    fn route(&self, path: &str) -> Result<(Arc<RegisteredQuery>, QueryArguments), ObservableError>;
}

/// In-memory [QueryResolver].
#[derive(Default)]
pub struct QueryRegistry {
    queries: SkipMap<String, Arc<RegisteredQuery>>,
}

impl QueryRegistry {
    /// Return a new instance.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a query. A previous query with the same name is replaced.
    pub fn register(&self, name: &str, route: &str, performer: Arc<dyn QueryPerformer>) {
        let route = RouteTemplate::parse(route);
        log::info!(
            "Registered {} query '{name}' at '{route}'.",
            performer.shape()
        );
        self.queries.insert(
            name.to_owned(),
            Arc::new(RegisteredQuery {
                name: name.to_owned(),
                route,
                performer,
            }),
        );
    }

    /// Register a query answered by the subject selected by
    /// `select_subject`.
    pub fn register_subject<T, F>(&self, name: &str, route: &str, select_subject: F)
    where
        T: Serialize + Clone + Send + Sync + 'static,
        F: Fn(&QueryRequest) -> Result<Arc<BehaviorSubject<T>>, ObservableError>
            + Send
            + Sync
            + 'static,
    {
        self.register(name, route, Arc::new(SubjectPerformer::new(select_subject)));
    }

    /// Register a query answered by the snapshots of the stream created by
    /// `create_stream`.
    pub fn register_snapshots<T, S, F>(&self, name: &str, route: &str, create_stream: F)
    where
        T: Serialize + 'static,
        S: Stream<Item = Result<T, ObservableError>> + Send + 'static,
        F: Fn(&QueryRequest) -> Result<S, ObservableError> + Send + Sync + 'static,
    {
        self.register(name, route, Arc::new(SnapshotsPerformer::new(create_stream)));
    }

    /// Number of registered queries.
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// Return `true` if no queries are registered.
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

impl QueryResolver for QueryRegistry {
    fn resolve(&self, query_name: &str) -> Result<Arc<RegisteredQuery>, ObservableError> {
        self.queries
            .get(query_name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| {
                ObservableErrorKind::QueryNotFound
                    .error_with_msg(format!("No query named '{query_name}'."))
            })
    }

    /// Literal route segments take precedence over placeholders. Among
    /// equally specific routes the first query by name wins.
    fn route(&self, path: &str) -> Result<(Arc<RegisteredQuery>, QueryArguments), ObservableError> {
        let mut best_match: Option<(Vec<bool>, Arc<RegisteredQuery>, QueryArguments)> = None;
        for entry in self.queries.iter() {
            let Some(arguments) = entry.value().route().match_path(path) else {
                continue;
            };
            let specificity = entry.value().route().specificity();
            if best_match
                .as_ref()
                .is_none_or(|(best_specificity, _, _)| specificity > *best_specificity)
            {
                best_match = Some((specificity, Arc::clone(entry.value()), arguments));
            }
        }
        best_match
            .map(|(_, query, arguments)| (query, arguments))
            .ok_or_else(|| {
                ObservableErrorKind::QueryNotFound
                    .error_with_msg(format!("No query at '{path}'."))
            })
    }
}
