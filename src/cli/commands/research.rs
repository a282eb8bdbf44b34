use crate::cli::ResearchArgs;
use crate::config::Config;
use crate::services::format::render;
use crate::services::research::{Diagnostic, Researcher, Severity};

pub async fn cmd_research(config: &Config, args: ResearchArgs) -> anyhow::Result<()> {
    let topic = args.topic.join(" ");
    let researcher = Researcher::from_config(config, args.interactive, !args.no_cache);

    eprintln!("Researching keywords for: {topic}");

    let report = researcher
        .research(&topic, args.limit, args.api_key.as_deref())
        .await?;

    for diagnostic in &report.diagnostics {
        print_diagnostic(diagnostic);
    }

    eprintln!("Source: {}", report.provenance);
    if let Some(top) = report.top() {
        eprintln!(
            "✓ Top keyword: {} (relevance {}/100)\n",
            top.phrase, top.relevance
        );
    }

    println!("{}", render(&report.candidates, args.format)?);
    Ok(())
}

fn print_diagnostic(diagnostic: &Diagnostic) {
    match diagnostic.severity() {
        Severity::Info => eprintln!("✓ {diagnostic}"),
        Severity::Warning => eprintln!("⚠ {diagnostic}"),
    }
}
