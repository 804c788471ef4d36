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

//! Request of an observable query.

use arc_client::QueryArguments;

/// Everything known about a request to observe a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    query_name: String,
    route_arguments: QueryArguments,
    query_arguments: QueryArguments,
    source_id: Option<String>,
    identity: Option<String>,
}

impl QueryRequest {
    /// Return a new instance.
    pub fn new(
        query_name: &str,
        route_arguments: QueryArguments,
        query_arguments: QueryArguments,
    ) -> Self {
        Self {
            query_name: query_name.to_owned(),
            route_arguments,
            query_arguments,
            source_id: None,
            identity: None,
        }
    }

    /// Return a copy with the logical source (tenant or service) identifier.
    pub fn with_source_id(mut self, source_id: Option<String>) -> Self {
        self.source_id = source_id;
        self
    }

    /// Return a copy with the opaque caller identity.
    pub fn with_identity(mut self, identity: Option<String>) -> Self {
        self.identity = identity;
        self
    }

    /// Name of the query.
    pub fn query_name(&self) -> &str {
        &self.query_name
    }

    /// Arguments extracted from the route path.
    pub fn route_arguments(&self) -> &QueryArguments {
        &self.route_arguments
    }

    /// Arguments from the query string.
    pub fn query_arguments(&self) -> &QueryArguments {
        &self.query_arguments
    }

    /// Look up an argument in the route arguments first and then in the
    /// query string arguments.
    pub fn argument(&self, name: &str) -> Option<&str> {
        self.route_arguments
            .get(name)
            .or_else(|| self.query_arguments.get(name))
    }

    /// Logical source (tenant or service) identifier of the caller.
    pub fn source_id(&self) -> Option<&str> {
        self.source_id.as_deref()
    }

    /// Opaque identity of the caller, like the `Authorization` header.
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }
}
