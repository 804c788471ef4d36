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

//! Request path from a query request to an observable source.

use super::AuthorizationEvaluator;
use super::QueryRequest;
use super::QueryResolver;
use crate::observable::ObservableSource;
use crate::util::LogScopeDuration;
use arc_client::ObservableError;
use arc_client::ObservableErrorKind;
use arc_client::QueryArguments;
use arc_client::endpoint::QueryEndpoint;
use std::sync::Arc;
use std::time::Duration;

/// Resolves, authorizes and performs observable queries.
pub struct QueryPipeline {
    resolver: Arc<dyn QueryResolver>,
    authorization_evaluator: Arc<dyn AuthorizationEvaluator>,
}

impl QueryPipeline {
    /// Return a new instance.
    pub fn new(
        resolver: Arc<dyn QueryResolver>,
        authorization_evaluator: Arc<dyn AuthorizationEvaluator>,
    ) -> Arc<Self> {
        Arc::new(Self {
            resolver,
            authorization_evaluator,
        })
    }

    /// Build the request for a path relative to the API base path.
    ///
    /// The reserved source argument is moved from the query string
    /// arguments into [QueryRequest::source_id].
    pub fn request_for_path(
        &self,
        path: &str,
        mut query_arguments: QueryArguments,
        identity: Option<String>,
    ) -> Result<QueryRequest, ObservableError> {
        let (query, route_arguments) = self.resolver.route(path)?;
        let source_id = query_arguments.take(QueryEndpoint::SOURCE_ARGUMENT);
        Ok(
            QueryRequest::new(query.name(), route_arguments, query_arguments)
                .with_source_id(source_id)
                .with_identity(identity),
        )
    }

    /// Open the source answering `request`.
    ///
    /// Fails with [ObservableErrorKind::QueryNotFound],
    /// [ObservableErrorKind::Unauthorized] or any error of the performer.
    /// A performer that produces a source of a different shape than it
    /// declared fails with [ObservableErrorKind::SourceFailure].
    pub async fn open(&self, request: &QueryRequest) -> Result<ObservableSource, ObservableError> {
        let _log_scope_duration = LogScopeDuration::new(
            log::Level::Debug,
            module_path!(),
            "open",
            Duration::from_millis(100),
        );
        let query = self.resolver.resolve(request.query_name())?;
        if !self
            .authorization_evaluator
            .is_authorized(request)
            .await
        {
            return Err(ObservableErrorKind::Unauthorized.error_with_msg(format!(
                "Not authorized to observe '{}'.",
                request.query_name()
            )));
        }
        let declared_shape = query.performer().shape();
        let source = query.performer().perform(request).await?;
        if source.shape() != declared_shape {
            return Err(ObservableErrorKind::SourceFailure.error_with_msg(format!(
                "Query '{}' declared {declared_shape} but produced {}.",
                request.query_name(),
                source.shape()
            )));
        }
        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "Opened {declared_shape} source of '{}' for source '{}'.",
                request.query_name(),
                request.source_id().unwrap_or("-")
            );
        }
        Ok(source)
    }
}
