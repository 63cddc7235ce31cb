

use std::fmt::Write;

use super::models::RetrievalResult;
use crate::core::config::DEFAULT_CONTEXT_HEADING;


pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a legal assistant for Nigerian law. Give general \
legal information, not legal advice, and recommend a qualified lawyer for specific matters. Cite the \
relevant Nigerian law, regulator and deadline whenever you can. If you are unsure, say so.";


pub const CONTEXT_SECTION_TITLE: &str = "Nigerian Compliance Knowledge Base Context";

const CONTEXT_INSTRUCTIONS: &str = "**Instructions**: Use the above compliance information to \
provide accurate, up-to-date answers. If the user's question relates to any of the topics above, \
prioritize this authoritative information in your response. Always cite specific regulations and \
deadlines when available.";


pub const ENTRY_DELIMITER: &str = "---";


pub fn format_context(results: &[RetrievalResult]) -> String {
    format_context_with_heading(results, DEFAULT_CONTEXT_HEADING)
}

/// Markdown block for prompt injection; empty when there is nothing to inject.
pub fn format_context_with_heading(results: &[RetrievalResult], heading: &str) -> String {
    if results.is_empty() {
        return String::new();
    }

    let mut context = format!("# {}\n\n", heading);

    // write! into a String cannot fail
    for result in results {
        let entry = &result.entry;
        let _ = write!(context, "## {}\n\n{}\n\n", entry.question, entry.answer_body);

        if !entry.key_points.is_empty() {
            context.push_str("**Key Points:**\n");
            for point in &entry.key_points {
                let _ = writeln!(context, "- {}", point);
            }
            context.push('\n');
        }

        if !entry.compliance_checklist.is_empty() {
            context.push_str("**Compliance Checklist:**\n");
            for item in &entry.compliance_checklist {
                let _ = writeln!(context, "- [ ] {}", item);
            }
            context.push('\n');
        }

        if !entry.citations.is_empty() {
            context.push_str("**Sources:**\n");
            for citation in &entry.citations {
                let _ = writeln!(context, "- [{}]({})", citation.title, citation.url);
            }
            context.push('\n');
        }

        let _ = write!(context, "{}\n\n", ENTRY_DELIMITER);
    }

    context
}


pub fn augment_system_prompt(base_prompt: &str, results: &[RetrievalResult]) -> String {
    augment_system_prompt_with_heading(base_prompt, results, DEFAULT_CONTEXT_HEADING)
}

/// Appends the retrieved context to a system prompt. Without results the
/// prompt is returned untouched so the model answers unaugmented.
pub fn augment_system_prompt_with_heading(
    base_prompt: &str,
    results: &[RetrievalResult],
    heading: &str,
) -> String {
    if results.is_empty() {
        return base_prompt.to_string();
    }

    let context = format_context_with_heading(results, heading);
    format!(
        "{}\n\n## {}\n\n{}\n\n{}",
        base_prompt, CONTEXT_SECTION_TITLE, context, CONTEXT_INSTRUCTIONS
    )
}
