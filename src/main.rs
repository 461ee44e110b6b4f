use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use feedparse::config::ParserConfig;
use feedparse::sax::{self, Grammar, SaxCollector};
use feedparse::{date, feed, html, opml, sniff, RawInput};

#[derive(Parser, Debug)]
#[command(name = "feedparse", about = "Parse feeds, OPML and HTML pages and print the result as JSON")]
struct Args {
    /// Parser limits (TOML)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report what the file looks like
    Sniff { file: PathBuf },

    /// Parse an RSS, Atom, JSON Feed or RSS-in-JSON file
    Feed {
        file: PathBuf,
        /// URL the file was fetched from (defaults to a file:// URL)
        #[arg(long)]
        url: Option<String>,
    },

    /// Parse an OPML file
    Opml {
        file: PathBuf,
        /// Print re-exported OPML 2.0 instead of JSON
        #[arg(long)]
        export: bool,
    },

    /// Collect link/meta metadata from an HTML page
    Metadata {
        file: PathBuf,
        #[arg(long)]
        url: Option<String>,
    },

    /// List the anchors of an HTML page
    Links {
        file: PathBuf,
        #[arg(long)]
        url: Option<String>,
    },

    /// Strip HTML to plain text
    Strip {
        file: PathBuf,
        #[arg(long)]
        max_characters: Option<usize>,
        #[arg(long)]
        max_bytes: Option<usize>,
    },

    /// Parse a date string
    Date { value: String },

    /// Dump the SAX events of a file
    Events {
        file: PathBuf,
        /// Tag-soup HTML rules instead of XML
        #[arg(long)]
        html: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => ParserConfig::load(path)
            .with_context(|| format!("Failed to load config '{}'", path.display()))?,
        None => ParserConfig::default(),
    };

    match args.command {
        Command::Sniff { file } => {
            let bytes = read_file(&file).await?;
            print_json(&serde_json::json!({
                "feed_type": sniff::feed_type(&bytes),
                "html": sniff::is_probably_html(&bytes),
                "xml": sniff::is_probably_xml(&bytes),
                "json": sniff::is_probably_json(&bytes),
                "json_feed": sniff::is_probably_json_feed(&bytes),
                "rss_in_json": sniff::is_probably_rss_in_json(&bytes),
                "rss": sniff::is_probably_rss(&bytes),
                "atom": sniff::is_probably_atom(&bytes),
            }))
        }
        Command::Feed { file, url } => {
            let input = read_input(&file, url).await?;
            let parsed = feed::parse_feed_with_config(input, config)
                .await
                .with_context(|| format!("Failed to parse feed '{}'", file.display()))?;
            print_json(&parsed)
        }
        Command::Opml { file, export } => {
            let input = read_input(&file, None).await?;
            let document = opml::parse_opml_with_config(&input, &config)
                .with_context(|| format!("Failed to parse OPML '{}'", file.display()))?;
            if export {
                let xml = opml::export_opml(&document)?;
                println!("{xml}");
                Ok(())
            } else {
                print_json(&document)
            }
        }
        Command::Metadata { file, url } => {
            let input = read_input(&file, url).await?;
            print_json(&html::metadata::parse(&input))
        }
        Command::Links { file, url } => {
            let input = read_input(&file, url).await?;
            print_json(&html::links::parse(&input))
        }
        Command::Strip {
            file,
            max_characters,
            max_bytes,
        } => {
            let bytes = read_file(&file).await?;
            let text = html::strip_html(
                &bytes,
                max_bytes.unwrap_or(config.strip.max_output_bytes),
                max_characters.unwrap_or(config.strip.max_characters),
            );
            println!("{}", String::from_utf8_lossy(&text));
            Ok(())
        }
        Command::Date { value } => {
            let parsed = date::parse(&value);
            print_json(&serde_json::json!({ "input": value, "date": parsed }))
        }
        Command::Events { file, html } => {
            let bytes = read_file(&file).await?;
            let grammar = if html { Grammar::Html } else { Grammar::Xml };
            let collector = sax::parse(grammar, SaxCollector::new(), &bytes)
                .with_context(|| format!("Failed to tokenize '{}'", file.display()))?;
            print_json(&collector.into_events())
        }
    }
}

async fn read_file(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read '{}'", path.display()))
}

/// Reads `path` and pairs it with `url`, or a `file://` URL for the path.
async fn read_input(path: &Path, url: Option<String>) -> Result<RawInput> {
    let bytes = read_file(path).await?;
    let url = match url {
        Some(url) => url,
        None => std::fs::canonicalize(path)
            .ok()
            .and_then(|absolute| url::Url::from_file_path(absolute).ok())
            .map(|url| url.to_string())
            .unwrap_or_else(|| path.display().to_string()),
    };
    Ok(RawInput::new(url, bytes))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).context("Failed to serialize output")?;
    writeln!(stdout).context("Failed to write output")?;
    Ok(())
}
