use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;

use textmatch_cli::{ingest_dir, start_service};
use textmatch_core::config::Config;
use textmatch_core::logging::init_tracing;
use textmatch_core::types::IngestRequest;

#[derive(Parser)]
#[command(name = "textmatch")]
#[command(about = "Index text and run keyword match queries against a local index")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Index directory, overrides index.dir
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Index text: an argument, stdin, or every .txt file under --dir
    Ingest {
        /// Text to index (reads stdin when omitted)
        text: Option<String>,

        /// Walk a directory of .txt files, one paragraph number per file
        #[arg(long, conflicts_with = "text")]
        dir: Option<PathBuf>,

        /// Keep the whole input as a single unit
        #[arg(long)]
        document: bool,

        /// Paragraph number to attach to every unit
        #[arg(short, long, conflicts_with = "dir")]
        paragraph: Option<u64>,

        /// Caller-supplied id
        #[arg(long, conflicts_with = "dir")]
        id: Option<String>,
    },
    /// Units matching a single term
    Search {
        term: String,

        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Matches for every word of a paragraph
    Paragraph {
        #[arg(trailing_var_arg = true, required = true)]
        text: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("warn")?;
    let cli = Cli::parse();
    let mut settings = Config::load()?.settings()?;
    if let Some(dir) = cli.index_dir {
        settings.index.dir = Some(dir.to_string_lossy().into_owned());
    }
    if settings.index.dir.is_none() {
        anyhow::bail!("an index directory is required: pass --index-dir or set index.dir");
    }
    let service = start_service(&settings).await?;

    match cli.command {
        Commands::Ingest { dir: Some(dir), document, .. } => {
            let summary = ingest_dir(&service, &dir, document, true).await?;
            println!("Indexed {} units from {} files ({} skipped)", summary.units, summary.files, summary.skipped);
        }
        Commands::Ingest { text, document, paragraph, id, .. } => {
            let text = match text {
                Some(text) => text,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let base = if document { IngestRequest::document(text) } else { IngestRequest::lines(text) };
            let request = IngestRequest { paragraph_number: paragraph, id, ..base };
            let report = service.ingest(request).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Search { term, limit } => {
            let units = service.query_with_limit(&term, limit).await?;
            if units.is_empty() {
                println!("No results found");
            }
            for unit in units {
                let line = unit.sequence.and_then(|s| s.line_number).map(|n| format!(":{n}")).unwrap_or_default();
                println!("{}{}\t{}", unit.id, line, unit.text);
            }
        }
        Commands::Paragraph { text } => {
            let matches = service.query_paragraph(&text.join(" ")).await?;
            println!("{}", serde_json::to_string_pretty(&matches)?);
        }
    }
    Ok(())
}
