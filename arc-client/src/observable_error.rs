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

//! Errors of the observable query channel.

use std::error::Error;
use std::fmt;

/// Cause of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservableErrorKind {
    /// General failure. See message for details.
    Unspecified,
    /// A frame could not be parsed or a payload did not match the expected
    /// type.
    MalformedMessage,
    /// Socket level failure.
    TransportError,
    /// No query is registered under the requested name or route.
    QueryNotFound,
    /// The caller is not allowed to observe the query.
    Unauthorized,
    /// The data source of a query failed while producing values.
    SourceFailure,
    /// Query arguments did not satisfy the route template.
    InvalidArguments,
}

impl ObservableErrorKind {
    /// Create a new instance with an error message.
    pub fn error_with_msg<S: AsRef<str>>(self, msg: S) -> ObservableError {
        ObservableError {
            kind: self,
            msg: Some(msg.as_ref().to_string()),
        }
    }

    /// Create a new instance without an error message.
    pub fn error(self) -> ObservableError {
        ObservableError {
            kind: self,
            msg: None,
        }
    }
}

impl fmt::Display for ObservableErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/** Observable query channel error.

Create a new instance via [ObservableErrorKind].
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableError {
    kind: ObservableErrorKind,
    msg: Option<String>,
}

impl ObservableError {
    /// Return the type of error.
    pub fn kind(&self) -> &ObservableErrorKind {
        &self.kind
    }

    /// Return the error message if any.
    pub fn msg(&self) -> Option<&str> {
        self.msg.as_deref()
    }

    /// Return `true` if the operation that failed may succeed when retried.
    ///
    /// Only transport failures are retried. Rejected queries and failing
    /// sources are terminal for the subscription.
    pub fn is_retryable(&self) -> bool {
        self.kind == ObservableErrorKind::TransportError
    }
}

impl fmt::Display for ObservableError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(msg) = &self.msg {
            write!(f, "{} {}", self.kind, msg)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

impl AsRef<ObservableError> for ObservableError {
    fn as_ref(&self) -> &ObservableError {
        self
    }
}

impl Error for ObservableError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_retry_classification() {
        let e = ObservableErrorKind::TransportError.error_with_msg("connection reset");
        assert_eq!(e.to_string(), "TransportError connection reset");
        assert!(e.is_retryable());
        let e = ObservableErrorKind::Unauthorized.error();
        assert_eq!(e.to_string(), "Unauthorized");
        assert!(!e.is_retryable());
        assert!(!ObservableErrorKind::SourceFailure.error().is_retryable());
    }
}
