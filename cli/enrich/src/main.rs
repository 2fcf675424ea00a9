//! iggy-enrich CLI
//!
//! Enrich CSV files with boundary features from a data package.

use clap::Parser;

mod args;
mod run;

use args::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    // Initialize logging (to stderr, so stdout is clean for output)
    run::init_logging(args.log_level)?;

    // Run enrichment
    let summary = run::execute(args).await?;

    // Report results to stderr
    eprintln!();
    eprintln!("Enrichment completed:");
    eprintln!("  Rows:           {}", summary.rows);
    eprintln!("  Input columns:  {}", summary.input_columns);
    eprintln!("  Output columns: {}", summary.output_columns);
    eprintln!(
        "  Boundaries:     {}",
        summary
            .boundaries
            .iter()
            .map(|b| b.name())
            .collect::<Vec<_>>()
            .join(", ")
    );
    eprintln!("  Output:         {}", summary.output_path.display());

    Ok(())
}
