use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One phase of the constitution → specify → … → implement pipeline.
///
/// The declaration order is the canonical execution order; `Ord` follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Constitution,
    Specify,
    Clarify,
    Plan,
    Tasks,
    Checklist,
    Analyze,
    Implement,
}

impl Stage {
    pub fn all() -> &'static [Stage] {
        &[
            Stage::Constitution,
            Stage::Specify,
            Stage::Clarify,
            Stage::Plan,
            Stage::Tasks,
            Stage::Checklist,
            Stage::Analyze,
            Stage::Implement,
        ]
    }

    /// The stages `run --all` executes: the core specify → implement path.
    pub fn core_pipeline() -> &'static [Stage] {
        &[Stage::Specify, Stage::Plan, Stage::Tasks, Stage::Implement]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Constitution => "constitution",
            Stage::Specify => "specify",
            Stage::Clarify => "clarify",
            Stage::Plan => "plan",
            Stage::Tasks => "tasks",
            Stage::Checklist => "checklist",
            Stage::Analyze => "analyze",
            Stage::Implement => "implement",
        }
    }

    /// Position in the canonical order (0-based).
    pub fn index(self) -> usize {
        self as usize
    }

    /// Artifacts that must already exist in the spec directory before the stage runs.
    pub fn required_artifacts(self) -> &'static [&'static str] {
        match self {
            Stage::Constitution | Stage::Specify => &[],
            Stage::Clarify | Stage::Plan | Stage::Checklist => &["spec.yaml"],
            Stage::Tasks => &["plan.yaml"],
            Stage::Analyze => &["spec.yaml", "plan.yaml", "tasks.yaml"],
            Stage::Implement => &["tasks.yaml"],
        }
    }

    /// Artifacts the stage writes and its validator checks.
    pub fn produced_artifacts(self) -> &'static [&'static str] {
        match self {
            Stage::Constitution => &["constitution.yaml"],
            Stage::Specify | Stage::Clarify => &["spec.yaml"],
            Stage::Plan => &["plan.yaml"],
            Stage::Tasks => &["tasks.yaml"],
            Stage::Checklist => &["checklists"],
            Stage::Analyze | Stage::Implement => &[],
        }
    }

    /// Slash command understood by the agent, e.g. `/specflow.plan`.
    pub fn slash_command(self) -> String {
        format!("/specflow.{}", self.as_str())
    }

    /// Full agent command for this stage with optional free-form arguments.
    pub fn command(self, args: &str) -> String {
        let args = args.trim();
        if args.is_empty() {
            self.slash_command()
        } else {
            format!("{} {}", self.slash_command(), quote_arg(args))
        }
    }

    /// Required artifacts missing from `spec_dir`.
    pub fn missing_prerequisites(self, spec_dir: &Path) -> Vec<String> {
        self.required_artifacts()
            .iter()
            .filter(|name| !spec_dir.join(name).exists())
            .map(|name| name.to_string())
            .collect()
    }
}

fn quote_arg(arg: &str) -> String {
    if arg.starts_with('"') && arg.ends_with('"') && arg.len() >= 2 {
        return arg.to_string();
    }
    format!("\"{}\"", arg.replace('"', "\\\""))
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStage(pub String);

impl fmt::Display for UnknownStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown stage '{}' (expected one of: {})",
            self.0,
            Stage::all()
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for UnknownStage {}

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Stage::all()
            .iter()
            .copied()
            .find(|stage| stage.as_str() == needle)
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}

/// Parse a comma separated stage list and return it in canonical order, deduplicated.
pub fn parse_stage_list(raw: &str) -> Result<Vec<Stage>, UnknownStage> {
    let mut stages = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Stage::from_str)
        .collect::<Result<Vec<_>, _>>()?;
    stages.sort();
    stages.dedup();
    Ok(stages)
}
