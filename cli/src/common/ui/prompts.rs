//! Dry-run rendering and interactive confirmation.

use crate::common::docker::types::ConfirmationInfo;
use crate::core::error::Result;
use anyhow::Context;
use std::io::{self, BufRead, Write};

/// Multi-line text form of a dry-run result.
pub fn render_confirmation(info: &ConfirmationInfo) -> String {
    let mut out = format!("{} [{}]\n", info.title, info.tier);
    if !info.description.is_empty() {
        out.push_str(&format!("  {}\n", info.description));
    }
    if info.resources.is_empty() {
        out.push_str("  Nothing to remove.\n");
    } else {
        for resource in &info.resources {
            out.push_str(&format!("  - {}\n", resource));
        }
    }
    for warning in &info.warnings {
        out.push_str(&format!("  Warning: {}\n", warning));
    }
    if info.reversible {
        out.push_str(&format!("  Reversible: {}\n", info.undo));
    } else {
        out.push_str("  Not reversible.\n");
    }
    out
}

/// Asks `question` on `output` and reads one answer line from `input`.
/// Only `y`/`yes` (any case) confirm; end of input declines.
pub fn confirm_with(question: &str, input: &mut impl BufRead, output: &mut impl Write) -> Result<bool> {
    write!(output, "{} [y/N] ", question)?;
    output.flush()?;
    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

pub fn confirm(question: &str) -> Result<bool> {
    confirm_with(question, &mut io::stdin().lock(), &mut io::stdout())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::docker::types::SafetyTier;

    #[test]
    fn test_confirm_answers() {
        for (answer, expected) in [("y\n", true), ("YES\n", true), ("n\n", false), ("", false), ("maybe\n", false)] {
            let mut out = Vec::new();
            let confirmed = confirm_with("Remove?", &mut answer.as_bytes(), &mut out).unwrap();
            assert_eq!(confirmed, expected, "answer {:?}", answer);
            assert_eq!(String::from_utf8(out).unwrap(), "Remove? [y/N] ");
        }
    }

    #[test]
    fn test_render_confirmation() {
        let info = ConfirmationInfo::new(SafetyTier::HighRisk, "Remove image in use")
            .describe("Remove image app:v1.")
            .resources(vec!["app:v1 (4c0a1f6e2b9d)".into()])
            .warn("image used by 2 containers")
            .reversible("pull or rebuild the image");
        let text = render_confirmation(&info);
        assert!(text.starts_with("Remove image in use [high risk]\n"));
        assert!(text.contains("  - app:v1 (4c0a1f6e2b9d)\n"));
        assert!(text.contains("  Warning: image used by 2 containers\n"));
        assert!(text.contains("  Reversible: pull or rebuild the image\n"));

        let empty = render_confirmation(&ConfirmationInfo::new(SafetyTier::BulkDestructive, "Prune"));
        assert!(empty.contains("Nothing to remove."));
        assert!(empty.contains("Not reversible."));
    }
}
