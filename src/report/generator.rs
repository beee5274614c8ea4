//! Markdown and JSON report generation.

use crate::models::{Comment, UserDetails};
use crate::report::{Report, ReportMetadata};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", report.result.user_details.username));

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_user_section(&report.result.user_details));
    output.push_str(&generate_comments_section(
        &report.result.comments,
        &report.status.comments,
    ));
    output.push_str(&generate_friends_section(
        &report.result.friends,
        &report.status.friends,
    ));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Duration:** {:.3}s\n",
        metadata.duration_seconds
    ));
    section.push_str(&format!(
        "- **Dependent Timeout:** {}ms\n",
        metadata.dependent_timeout_ms
    ));
    section.push('\n');

    section
}

fn generate_user_section(user: &UserDetails) -> String {
    let mut section = String::new();

    section.push_str("## User\n\n");
    section.push_str(&format!("- **ID:** `{}`\n", user.id));
    section.push_str(&format!("- **Username:** {}\n\n", user.username));

    section
}

fn generate_comments_section(comments: &[Comment], status: &str) -> String {
    let mut section = String::new();

    section.push_str(&format!("## Comments ({})\n\n", comments.len()));
    section.push_str(&format!("_Status: {}_\n\n", status));

    if comments.is_empty() {
        section.push_str("_None_\n\n");
        return section;
    }

    for comment in comments {
        section.push_str(&format!("- `{}` {}\n", comment.id, comment.text));
    }
    section.push('\n');

    section
}

fn generate_friends_section(friends: &[UserDetails], status: &str) -> String {
    let mut section = String::new();

    section.push_str(&format!("## Friends ({})\n\n", friends.len()));
    section.push_str(&format!("_Status: {}_\n\n", status));

    if friends.is_empty() {
        section.push_str("_None_\n\n");
        return section;
    }

    section.push_str("| ID | Username |\n");
    section.push_str("|:---|:---|\n");
    for friend in friends {
        section.push_str(&format!("| `{}` | {} |\n", friend.id, friend.username));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by user-aggregator*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write rendered report content to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create report file {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    Ok(())
}
