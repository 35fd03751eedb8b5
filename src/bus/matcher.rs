// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::errors::{BusError, ConfigurationError};

/// How a subscription pattern is compared with an event tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    #[default]
    StartsWith,
    Regex,
    EndsWith,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::StartsWith => "startswith",
            MatchType::Regex => "regex",
            MatchType::EndsWith => "endswith",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchType {
    type Err = ConfigurationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "startswith" => Ok(MatchType::StartsWith),
            "regex" => Ok(MatchType::Regex),
            "endswith" => Ok(MatchType::EndsWith),
            other => Err(ConfigurationError::InvalidArgument {
                name: "match_type".to_string(),
                reason: format!("'{}' is not a match type", other),
            }),
        }
    }
}

/// Named groups captured by a regex match; empty for the other match types.
pub type MatchGroups = BTreeMap<String, String>;

/// Compiled regex cache keyed by pattern text.
#[derive(Debug, Default)]
pub struct PatternCache {
    compiled: RwLock<HashMap<String, Regex>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compile(&self, pattern: &str) -> Result<Regex, BusError> {
        if let Some(regex) = self.compiled.read().get(pattern) {
            return Ok(regex.clone());
        }
        let regex = Regex::new(pattern).map_err(|e| BusError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        self.compiled
            .write()
            .insert(pattern.to_string(), regex.clone());
        Ok(regex)
    }

    /// Groups of a successful match of `tag` against `pattern`, or `None`.
    pub fn matches(
        &self,
        tag: &str,
        pattern: &str,
        match_type: MatchType,
    ) -> Result<Option<MatchGroups>, BusError> {
        let groups = match match_type {
            MatchType::StartsWith => tag.starts_with(pattern).then(MatchGroups::new),
            MatchType::EndsWith => tag.ends_with(pattern).then(MatchGroups::new),
            MatchType::Regex => {
                let regex = self.compile(pattern)?;
                regex.captures(tag).map(|captures| {
                    regex
                        .capture_names()
                        .flatten()
                        .filter_map(|name| {
                            captures
                                .name(name)
                                .map(|m| (name.to_string(), m.as_str().to_string()))
                        })
                        .collect()
                })
            }
        };
        Ok(groups)
    }

    pub fn is_match(&self, tag: &str, pattern: &str, match_type: MatchType) -> Result<bool, BusError> {
        Ok(self.matches(tag, pattern, match_type)?.is_some())
    }

    pub fn len(&self) -> usize {
        self.compiled.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_table_driven() {
        struct TestCase {
            name: &'static str,
            tag: &'static str,
            pattern: &'static str,
            match_type: MatchType,
            expected: Option<Vec<(&'static str, &'static str)>>,
        }

        let test_cases = vec![
            TestCase {
                name: "prefix",
                tag: "ec2x/res/42",
                pattern: "ec2x/res/",
                match_type: MatchType::StartsWith,
                expected: Some(vec![]),
            },
            TestCase {
                name: "prefix miss",
                tag: "ble/res/42",
                pattern: "ec2x/",
                match_type: MatchType::StartsWith,
                expected: None,
            },
            TestCase {
                name: "suffix",
                tag: "system/service/ec2x/failed",
                pattern: "/failed",
                match_type: MatchType::EndsWith,
                expected: Some(vec![]),
            },
            TestCase {
                name: "request id capture",
                tag: "demo/req/4b1e-9f",
                pattern: "^demo/req/(?P<id>.+)$",
                match_type: MatchType::Regex,
                expected: Some(vec![("id", "4b1e-9f")]),
            },
            TestCase {
                name: "reply tag is not a request",
                tag: "demo/res/4b1e-9f",
                pattern: "^demo/req/(?P<id>.+)$",
                match_type: MatchType::Regex,
                expected: None,
            },
        ];

        let cache = PatternCache::new();
        for test_case in test_cases {
            let actual = cache
                .matches(test_case.tag, test_case.pattern, test_case.match_type)
                .unwrap();
            let expected = test_case.expected.map(|groups| {
                groups
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect::<MatchGroups>()
            });
            assert_eq!(actual, expected, "Test case '{}'", test_case.name);
        }
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalid_regex_is_reported() {
        let cache = PatternCache::new();
        let err = cache.matches("a", "(", MatchType::Regex).unwrap_err();
        assert!(matches!(err, BusError::InvalidPattern { .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn match_type_parses_wire_names() {
        assert_eq!("regex".parse::<MatchType>().unwrap(), MatchType::Regex);
        assert!("glob".parse::<MatchType>().is_err());
    }
}
