use std::path::Path;

use thiserror::Error;

/// An artifact failed validation.
///
/// The message may contain zero or more `"- "`-prefixed lines; each is one
/// discrete problem that is fed back to the agent on the next attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Build a message with a header line followed by one bullet per error.
    pub fn from_errors<I, S>(header: &str, errors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut message = header.to_string();
        for err in errors {
            message.push_str("\n- ");
            message.push_str(err.as_ref());
        }
        Self { message }
    }

    /// Discrete error strings, in order.
    pub fn errors(&self) -> Vec<String> {
        extract_validation_errors(&self.message)
    }
}

/// Pull the `"- "` bullet lines out of a validation message.
///
/// When no bullet is present the whole (trimmed) message is a single error; an
/// empty message yields no errors.
pub fn extract_validation_errors(message: &str) -> Vec<String> {
    let bullets: Vec<String> = message
        .lines()
        .map(str::trim_start)
        .filter_map(|line| line.strip_prefix("- "))
        .map(|rest| rest.trim_end().to_string())
        .filter(|rest| !rest.is_empty())
        .collect();

    if !bullets.is_empty() {
        return bullets;
    }

    let whole = message.trim();
    if whole.is_empty() {
        Vec::new()
    } else {
        vec![whole.to_string()]
    }
}

/// Checks the artifacts a stage left in its artifact directory.
pub trait Validator: Send + Sync {
    fn validate(&self, artifact_dir: &Path) -> Result<(), ValidationError>;
}

impl<F> Validator for F
where
    F: Fn(&Path) -> Result<(), ValidationError> + Send + Sync,
{
    fn validate(&self, artifact_dir: &Path) -> Result<(), ValidationError> {
        self(artifact_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn extracts_bullet_lines_verbatim() {
        let msg = "spec.yaml is invalid:\n- missing field: feature.title\n  - wrong type at user_stories[0].priority\nnot a bullet\n";
        assert_eq!(
            extract_validation_errors(msg),
            vec![
                "missing field: feature.title".to_string(),
                "wrong type at user_stories[0].priority".to_string(),
            ]
        );
    }

    #[test]
    fn whole_message_when_no_bullets() {
        assert_eq!(
            extract_validation_errors("  plan.yaml not found \n"),
            vec!["plan.yaml not found".to_string()]
        );
        assert!(extract_validation_errors("   ").is_empty());
    }

    #[test]
    fn from_errors_round_trips_through_extract() {
        let err = ValidationError::from_errors("tasks.yaml failed:", ["a", "b"]);
        assert_eq!(err.message, "tasks.yaml failed:\n- a\n- b");
        assert_eq!(err.errors(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn closures_are_validators() {
        let v = |_: &Path| -> Result<(), ValidationError> { Err(ValidationError::new("nope")) };
        assert_eq!(
            v.validate(Path::new(".")).unwrap_err().errors(),
            vec!["nope".to_string()]
        );
    }
}
