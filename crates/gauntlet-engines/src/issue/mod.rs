//! Issues reported on an engine's stdout.
//!
//! Engines write JSON documents separated by NUL bytes or whitespace. Only
//! documents whose `type` is `issue` are kept; the location sub-field is
//! parsed into a [`LocationDescriptor`].

use serde::Deserialize;
use serde_json::Value;

use crate::location::{LocationDescription, LocationDescriptor, SourceBuffer};

/// One issue reported by an engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineIssue {
    #[serde(default)]
    check_name: Option<String>,
    description: String,
    location: IssueLocation,
}

/// Where an issue was found.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IssueLocation {
    path: String,
    #[serde(flatten)]
    range: LocationDescriptor,
}

impl EngineIssue {
    /// Check that raised the issue, if reported.
    #[must_use]
    pub fn check_name(&self) -> Option<&str> {
        self.check_name.as_deref()
    }

    /// Human-readable description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// File path relative to the analysed source tree.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.location.path
    }

    /// Range within the file.
    #[must_use]
    pub const fn range(&self) -> &LocationDescriptor {
        &self.location.range
    }

    /// Describes the range against `source`, appending `suffix`.
    #[must_use]
    pub fn describe_location<'a, B: SourceBuffer + ?Sized>(
        &self,
        source: &'a B,
        suffix: &str,
    ) -> LocationDescription<'a, B> {
        LocationDescription::new(source, Some(self.location.range), suffix)
    }
}

/// Parses every issue document in `output`.
///
/// Each element is either a parsed issue or the error for a malformed
/// document; non-issue documents are skipped.
#[must_use]
pub fn parse_issues(output: &[u8]) -> Vec<Result<EngineIssue, serde_json::Error>> {
    let mut issues = Vec::new();
    for document in output.split(|byte| *byte == 0) {
        for value in serde_json::Deserializer::from_slice(document).into_iter::<Value>() {
            match value {
                Ok(value) if is_issue(&value) => issues.push(serde_json::from_value(value)),
                Ok(_) => {}
                Err(err) => {
                    issues.push(Err(err));
                    break;
                }
            }
        }
    }
    issues
}

fn is_issue(value: &Value) -> bool {
    value
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(|kind| kind.eq_ignore_ascii_case("issue"))
}
