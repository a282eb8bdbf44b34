use clap::ValueEnum;
use std::fmt::Write as _;

use crate::models::KeywordCandidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One JSON record per candidate
    Json,
    /// Markdown table
    #[default]
    Markdown,
    /// One line per candidate
    Simple,
}

pub fn render(candidates: &[KeywordCandidate], format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(candidates),
        OutputFormat::Markdown => Ok(render_markdown(candidates)),
        OutputFormat::Simple => Ok(render_simple(candidates)),
    }
}

fn render_markdown(candidates: &[KeywordCandidate]) -> String {
    let mut out = String::from("# Keyword Research Results\n\n");
    out.push_str("| # | Keyword | Search Volume | Difficulty | Relevance | Source |\n");
    out.push_str("|--:|---------|--------------:|-----------:|----------:|--------|\n");

    for (i, kw) in candidates.iter().enumerate() {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {}/100 | {}/100 | {} |",
            i + 1,
            escape_cell(&kw.phrase),
            group_thousands(kw.search_volume),
            kw.difficulty,
            kw.relevance,
            kw.source,
        );
    }

    let with_related: Vec<_> = candidates.iter().filter(|c| !c.related.is_empty()).collect();
    if !with_related.is_empty() {
        out.push_str("\n## Related\n\n");
        for kw in with_related {
            let _ = writeln!(out, "- **{}:** {}", kw.phrase, kw.related.join(", "));
        }
    }

    out
}

fn render_simple(candidates: &[KeywordCandidate]) -> String {
    candidates
        .iter()
        .enumerate()
        .map(|(i, kw)| {
            format!(
                "{}. {} (Vol: {}, Diff: {}, Score: {})",
                i + 1,
                kw.phrase,
                group_thousands(kw.search_volume),
                kw.difficulty,
                kw.relevance
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|")
}

#[must_use]
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
