use std::io::Read;

use anyhow::{Context, Result};
use tracing::{info, Level};

use deferred_citations::{DeferredParser, Delimiters};

const USAGE: &str = "usage: deferred-citations [--all] [PATH]";

fn main() -> Result<()> {
    let _ = dotenv::dotenv();

    let level = dotenv::var("LOG_LEVEL")
        .ok()
        .and_then(|s| s.parse::<Level>().ok())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut all = false;
    let mut path = None;
    for arg in std::env::args().skip(1) {
        if arg == "--all" {
            all = true;
        } else if arg == "-h" || arg == "--help" {
            println!("{}", USAGE);
            return Ok(());
        } else if path.is_none() {
            path = Some(arg);
        } else {
            anyhow::bail!("unexpected argument `{}`\n{}", arg, USAGE);
        }
    }

    let input = match &path {
        Some(p) => std::fs::read_to_string(p).with_context(|| format!("Failed to read {}", p))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let delimiters = Delimiters::from_env();
    info!(start = %delimiters.start, end = %delimiters.end, "Using citation delimiters");
    let parser = DeferredParser::new(delimiters);

    let output = if all {
        serde_json::to_string_pretty(&parser.all_citations(&input))
    } else {
        let result = parser.parse(&input);
        info!(
            success = result.success,
            citations = result.citations.len(),
            "Parsed response"
        );
        serde_json::to_string_pretty(&result)
    }
    .context("Failed to serialize output")?;

    println!("{}", output);
    Ok(())
}
