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

//! Route templates like `/items/{id}`.

use super::QueryArguments;
use crate::ObservableError;
use crate::ObservableErrorKind;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// Parsed route template where `{name}` segments are placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
    segments: Vec<Segment>,
}

impl RouteTemplate {
    /// Parse a template like `/items/{id}/history`.
    ///
    /// Leading, trailing and repeated slashes are ignored.
    pub fn parse(template: &str) -> Self {
        let segments = template
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                segment
                    .strip_prefix('{')
                    .and_then(|s| s.strip_suffix('}'))
                    .map(|name| Segment::Placeholder(name.to_owned()))
                    .unwrap_or_else(|| Segment::Literal(segment.to_owned()))
            })
            .collect();
        Self { segments }
    }

    /// Names of the placeholders in the order they appear.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Rank of this template among templates matching the same path.
    ///
    /// Greater is more specific: a literal segment outranks a placeholder,
    /// with earlier segments deciding first.
    pub fn specificity(&self) -> Vec<bool> {
        self.segments
            .iter()
            .map(|segment| matches!(segment, Segment::Literal(_)))
            .collect()
    }

    /// Substitute placeholders with the matching arguments.
    ///
    /// Return the unencoded path segments and the arguments that were not
    /// consumed by the template.
    ///
    /// Route argument values must not contain `/`, since the server matches
    /// the decoded request path segment by segment.
    pub fn expand(
        &self,
        arguments: &QueryArguments,
    ) -> Result<(Vec<String>, QueryArguments), ObservableError> {
        let mut remaining = arguments.clone();
        let segments = self
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(literal) => Ok(literal.to_owned()),
                Segment::Placeholder(name) => match remaining.take(name) {
                    Some(value) if value.contains('/') => {
                        Err(ObservableErrorKind::InvalidArguments.error_with_msg(format!(
                            "Route argument '{name}' of '{self}' contains '/'."
                        )))
                    }
                    Some(value) => Ok(value),
                    None => Err(ObservableErrorKind::InvalidArguments
                        .error_with_msg(format!("Missing route argument '{name}' for '{self}'."))),
                },
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok((segments, remaining))
    }

    /// Match a decoded request path against this template.
    ///
    /// Return the placeholder values on a match.
    pub fn match_path(&self, path: &str) -> Option<QueryArguments> {
        let mut parts = path.split('/').filter(|part| !part.is_empty());
        let mut arguments = QueryArguments::default();
        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Placeholder(name) => arguments.insert(name, part),
            }
        }
        parts.next().is_none().then_some(arguments)
    }
}

impl fmt::Display for RouteTemplate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => write!(f, "/{literal}")?,
                Segment::Placeholder(name) => write!(f, "/{{{name}}}")?,
            }
        }
        Ok(())
    }
}
