//! Test Suite Generator
//!
//! Emits a pytest suite next to exported artifacts: `tests/conftest.py` with shared
//! fixtures plus one `tests/test_<category>.py` per selected category. What the suite
//! exercises depends on the target's [`TestProfile`]. Provider calls are stubbed unless
//! `AGENTSPEC_LIVE_PROVIDER=1` is set when the suite runs.

mod application;
mod resources;

use crate::error::PipelineError;
use crate::export::{ExportArtifact, ExportContext};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Directory generated tests are written to.
pub const TESTS_DIR: &str = "tests";

/// Environment variable that enables real provider calls in generated tests.
pub const LIVE_PROVIDER_ENV: &str = "AGENTSPEC_LIVE_PROVIDER";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestCategory {
    Unit,
    Integration,
    Load,
    Safety,
    ResourcePolicy,
}

impl TestCategory {
    pub const ALL: [TestCategory; 5] = [
        TestCategory::Unit,
        TestCategory::Integration,
        TestCategory::Load,
        TestCategory::Safety,
        TestCategory::ResourcePolicy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TestCategory::Unit => "unit",
            TestCategory::Integration => "integration",
            TestCategory::Load => "load",
            TestCategory::Safety => "safety",
            TestCategory::ResourcePolicy => "resource-policy",
        }
    }

    /// `tests/test_resource_policy.py`
    pub fn file_path(&self) -> String {
        format!("{}/test_{}.py", TESTS_DIR, self.as_str().replace('-', "_"))
    }
}

impl fmt::Display for TestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestCategory {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace('_', "-");
        TestCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown test category '{}' (expected unit, integration, load, safety or resource-policy)",
                    raw
                )
            })
    }
}

/// Flavour of tests a target gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestProfile {
    /// Drive the generated Python service.
    Application,
    /// Parse and inspect generated deployment resources.
    Resources,
}

/// Categories to generate. Empty means no tests at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestSelection {
    categories: BTreeSet<TestCategory>,
}

impl TestSelection {
    pub fn new(categories: impl IntoIterator<Item = TestCategory>) -> Self {
        Self {
            categories: categories.into_iter().collect(),
        }
    }

    pub fn all() -> Self {
        Self::new(TestCategory::ALL)
    }

    /// Parse category names; `all` selects every category.
    pub fn parse_list<S: AsRef<str>>(names: impl IntoIterator<Item = S>) -> Result<Self, String> {
        let mut categories = BTreeSet::new();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                continue;
            }
            if name.eq_ignore_ascii_case("all") {
                categories.extend(TestCategory::ALL);
            } else {
                categories.insert(name.parse()?);
            }
        }
        Ok(Self { categories })
    }

    pub fn contains(&self, category: TestCategory) -> bool {
        self.categories.contains(&category)
    }

    pub fn iter(&self) -> impl Iterator<Item = TestCategory> + '_ {
        self.categories.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }
}

impl FromStr for TestSelection {
    type Err = String;

    /// Comma-separated list: `unit,safety`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse_list(raw.split(','))
    }
}

impl fmt::Display for TestSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|c| c.as_str()).collect();
        f.write_str(&names.join(","))
    }
}

/// Generate the test artifacts for an export in progress.
pub fn generate_tests(
    ctx: &ExportContext<'_>,
    selection: &TestSelection,
) -> Result<Vec<ExportArtifact>, PipelineError> {
    if selection.is_empty() {
        return Ok(Vec::new());
    }

    let mut artifacts = Vec::with_capacity(selection.len() + 1);
    match ctx.target.test_profile {
        TestProfile::Application => {
            let suite = application::Suite::new(ctx);
            artifacts.push(ExportArtifact::test(format!("{}/conftest.py", TESTS_DIR), suite.conftest()));
            for category in selection.iter() {
                artifacts.push(ExportArtifact::test(category.file_path(), suite.module(category)));
            }
        }
        TestProfile::Resources => {
            let suite = resources::Suite::new(ctx)?;
            artifacts.push(ExportArtifact::test(format!("{}/conftest.py", TESTS_DIR), suite.conftest()));
            for category in selection.iter() {
                artifacts.push(ExportArtifact::test(category.file_path(), suite.module(category)));
            }
        }
    }

    debug!(
        manifest = ctx.name(),
        target = ctx.target.name,
        categories = %selection,
        "Generated tests"
    );
    Ok(artifacts)
}

/// Module docstring shared by every generated test file.
fn header(ctx: &ExportContext<'_>, what: &str) -> String {
    format!(
        "\"\"\"{} for {} ({} target). Generated by agentspec.\"\"\"\n\nfrom __future__ import annotations\n\n",
        what,
        ctx.name(),
        ctx.target.name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parsing() {
        assert_eq!("resource_policy".parse::<TestCategory>().unwrap(), TestCategory::ResourcePolicy);
        assert_eq!(" Safety ".parse::<TestCategory>().unwrap(), TestCategory::Safety);
        assert!("fuzz".parse::<TestCategory>().is_err());
    }

    #[test]
    fn test_selection_parsing() {
        let selection: TestSelection = "safety,unit,,unit".parse().unwrap();
        assert_eq!(selection.iter().collect::<Vec<_>>(), vec![TestCategory::Unit, TestCategory::Safety]);
        assert_eq!(selection.to_string(), "unit,safety");
        assert_eq!(TestSelection::parse_list(["all"]).unwrap(), TestSelection::all());
        assert!(TestSelection::parse_list(["unit", "smoke"]).is_err());
    }

    #[test]
    fn test_file_paths() {
        assert_eq!(TestCategory::ResourcePolicy.file_path(), "tests/test_resource_policy.py");
        assert_eq!(TestCategory::Unit.file_path(), "tests/test_unit.py");
    }
}
