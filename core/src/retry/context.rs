use std::fmt::Write;

/// Bullets listed before the remainder is summarized.
pub const MAX_LISTED_ERRORS: usize = 10;

const ERRORS_HEADER: &str = "Schema validation failed with the following errors:";

const INSTRUCTIONS_FOOTER: &str = "\
How to fix:
Each line above starting with \"- \" is one problem found in the artifact you produced.
Common error types:
- missing field: a required field is absent; add it with a valid value.
- invalid enum value: use one of the allowed values listed in the error.
- wrong type: the value has the wrong type (for example a string where a list is expected).
- pattern mismatch: the value does not match the required format (IDs, dates, paths).
- unexpected field: remove fields the schema does not define.
Regenerate the complete artifact with every listed problem fixed, keeping all content that was already valid.";

/// Render the retry-context block for attempt `attempt` out of `max_retries`.
///
/// Always starts with `RETRY <attempt>/<max_retries>`. The error list and the
/// instructional footer are only emitted when there is at least one error.
pub fn format_retry_context(attempt: u32, max_retries: u32, errors: &[String]) -> String {
    let mut out = format!("RETRY {attempt}/{max_retries}");
    if errors.is_empty() {
        return out;
    }

    out.push('\n');
    out.push_str(ERRORS_HEADER);
    for err in errors.iter().take(MAX_LISTED_ERRORS) {
        out.push_str("\n- ");
        out.push_str(err);
    }
    if errors.len() > MAX_LISTED_ERRORS {
        let _ = write!(
            out,
            "\n...and {} more errors",
            errors.len() - MAX_LISTED_ERRORS
        );
    }
    out.push_str("\n\n");
    out.push_str(INSTRUCTIONS_FOOTER);
    out
}

/// Append the retry-context block to the original command, separated by a blank line.
pub fn build_retry_command(
    original: &str,
    attempt: u32,
    max_retries: u32,
    errors: &[String],
) -> String {
    let context = format_retry_context(attempt, max_retries, errors);
    let original = original.trim_end();
    if original.is_empty() {
        context
    } else {
        format!("{original}\n\n{context}")
    }
}
