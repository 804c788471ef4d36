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

//! Connection endpoint of a query subscription.

use super::QueryArguments;
use super::RouteTemplate;
use crate::ObservableError;
use crate::ObservableErrorKind;
use crate::conf::ClientConfig;
use std::fmt;
use url::Url;

/// Fully resolved URL of a query subscription.
///
/// The URL is composed of the configured origin and API base path, the
/// expanded route, the remaining arguments as query string parameters and
/// the reserved [Self::SOURCE_ARGUMENT] when the client is configured with
/// a source identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryEndpoint {
    url: String,
}

impl QueryEndpoint {
    /// Reserved query string parameter carrying the logical source (tenant or
    /// microservice) identifier.
    pub const SOURCE_ARGUMENT: &str = "_source";

    /// Resolve the endpoint of `template` with `arguments`.
    pub fn resolve(
        config: &ClientConfig,
        template: &RouteTemplate,
        arguments: &QueryArguments,
    ) -> Result<Self, ObservableError> {
        if arguments.get(Self::SOURCE_ARGUMENT).is_some() {
            return Err(ObservableErrorKind::InvalidArguments.error_with_msg(format!(
                "The argument name '{}' is reserved.",
                Self::SOURCE_ARGUMENT
            )));
        }
        let (route_segments, remaining) = template.expand(arguments)?;
        let mut url = Url::parse(config.origin()).map_err(|e| {
            ObservableErrorKind::InvalidArguments
                .error_with_msg(format!("Bad origin '{}': {e}", config.origin()))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                ObservableErrorKind::InvalidArguments
                    .error_with_msg(format!("Origin '{}' can't have a path.", config.origin()))
            })?
            .pop_if_empty()
            .extend(config.base_path().split('/').filter(|s| !s.is_empty()))
            .extend(route_segments);
        if !remaining.is_empty() || config.source_id().is_some() {
            let mut query_pairs = url.query_pairs_mut();
            for (name, value) in remaining.iter() {
                query_pairs.append_pair(name, value);
            }
            if let Some(source_id) = config.source_id() {
                query_pairs.append_pair(Self::SOURCE_ARGUMENT, source_id);
            }
        }
        Ok(Self { url: url.into() })
    }

    /// Return a new instance from an already resolved URL.
    pub fn from_url(url: &str) -> Self {
        Self {
            url: url.to_owned(),
        }
    }

    /// The resolved URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for QueryEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_and_query_arguments() {
        let config = ClientConfig::new("http://localhost:8080/");
        let arguments = QueryArguments::default()
            .with("id", "my-item-id")
            .with("filter", "active")
            .with("limit", 50);
        let endpoint =
            QueryEndpoint::resolve(&config, &RouteTemplate::parse("/items/{id}"), &arguments)
                .unwrap();
        let url = endpoint.url();
        assert!(url.contains("/api/items/my-item-id"), "{url}");
        assert!(url.contains("filter=active"), "{url}");
        assert!(url.contains("limit=50"), "{url}");
        assert!(!url.contains(QueryEndpoint::SOURCE_ARGUMENT));
        assert_eq!(
            url,
            "http://localhost:8080/api/items/my-item-id?filter=active&limit=50"
        );
    }

    #[test]
    fn test_source_and_encoding() {
        let config = ClientConfig::new("https://example.com")
            .with_base_path("/v2/api/")
            .with_source_id("tenant a");
        let arguments = QueryArguments::default().with("name", "a b?");
        let endpoint =
            QueryEndpoint::resolve(&config, &RouteTemplate::parse("/by-name/{name}"), &arguments)
                .unwrap();
        assert_eq!(
            endpoint.url(),
            "https://example.com/v2/api/by-name/a%20b%3F?_source=tenant+a"
        );
    }

    #[test]
    fn test_reserved_argument() {
        let config = ClientConfig::new("http://localhost");
        let arguments = QueryArguments::default().with(QueryEndpoint::SOURCE_ARGUMENT, "x");
        let e = QueryEndpoint::resolve(&config, &RouteTemplate::parse("/items"), &arguments)
            .unwrap_err();
        assert_eq!(e.kind(), &ObservableErrorKind::InvalidArguments);
    }
}
