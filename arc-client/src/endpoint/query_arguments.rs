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

//! Named arguments of a query.

use std::fmt::Display;

/// Ordered named arguments of a query.
///
/// Arguments matching a placeholder of the route template become part of
/// the path. The rest are sent as query string parameters in insertion
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryArguments {
    entries: Vec<(String, String)>,
}

impl QueryArguments {
    /// Return a copy with an additional argument.
    ///
    /// A previous value of the same argument is replaced.
    pub fn with<V: Display>(mut self, name: &str, value: V) -> Self {
        self.insert(name, value);
        self
    }

    /// Add or replace an argument.
    pub fn insert<V: Display>(&mut self, name: &str, value: V) {
        let value = value.to_string();
        if let Some(entry) = self.entries.iter_mut().find(|(key, _)| key == name) {
            entry.1 = value;
        } else {
            self.entries.push((name.to_owned(), value));
        }
    }

    /// Return the value of the named argument.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Remove and return the value of the named argument.
    pub fn take(&mut self, name: &str) -> Option<String> {
        self.entries
            .iter()
            .position(|(key, _)| key == name)
            .map(|index| self.entries.remove(index).1)
    }

    /// Iterate over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: AsRef<str>, V: Display> FromIterator<(K, V)> for QueryArguments {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut ret = Self::default();
        for (name, value) in iter {
            ret.insert(name.as_ref(), value);
        }
        ret
    }
}
