//! Command-line front end for ragdesk.
//!
//! Usage:
//!   ragdesk init                                   # write a default config.json
//!   ragdesk doc add --title T --file policy.md     # store a document
//!   ragdesk doc process 1                          # split it into chunks
//!   ragdesk ask "How many vacation days?"          # answer from the knowledge base

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

use ragdesk::application::{
    CreateChunkRequest, CreateDocumentRequest, ProcessDocumentRequest, QueryRequest,
    UpdateDocumentRequest,
};
use ragdesk::domain::DocumentId;
use ragdesk::settings::ConfigManager;
use ragdesk::AppHandles;

#[derive(Parser)]
#[command(
    name = "ragdesk",
    version,
    about = "Retrieval-augmented answers over a small knowledge base"
)]
struct Cli {
    /// Data directory (defaults to RAGDESK_DATA_DIR or the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the default config.json unless one exists
    Init,
    /// Manage documents and their chunks
    #[command(subcommand)]
    Doc(DocCommand),
    /// Rank chunks for a query without generating an answer
    Search {
        query: String,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// Answer a question from the retrieved chunks
    Ask {
        query: String,
        #[arg(short = 'k', long)]
        max_chunks: Option<usize>,
        #[arg(short, long)]
        temperature: Option<f32>,
        /// Leave retrieved chunks out of the output
        #[arg(long)]
        no_sources: bool,
    },
    /// Most recent logged questions
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Check that the store is reachable
    Health,
}

#[derive(Subcommand)]
enum DocCommand {
    /// Add a document from inline text or a file
    Add(AddDocument),
    List {
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    Show {
        id: DocumentId,
    },
    /// Change fields of a document; chunks are untouched until the next process
    Update {
        id: DocumentId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, conflicts_with = "file")]
        content: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        source: Option<String>,
        #[arg(long = "type")]
        document_type: Option<String>,
    },
    /// Delete a document and all of its chunks
    Delete {
        id: DocumentId,
    },
    /// Replace a document's chunks with a fresh split of its content
    Process {
        id: DocumentId,
        #[arg(long)]
        chunk_size: Option<usize>,
        #[arg(long)]
        chunk_overlap: Option<usize>,
    },
    Chunks {
        id: DocumentId,
    },
    /// Attach a hand-written chunk to a document
    AddChunk {
        id: DocumentId,
        #[arg(long)]
        content: String,
        #[arg(long)]
        order: u32,
    },
}

#[derive(Args)]
struct AddDocument {
    #[arg(long)]
    title: String,
    #[arg(long, required_unless_present = "file", conflicts_with = "file")]
    content: Option<String>,
    #[arg(long)]
    file: Option<PathBuf>,
    #[arg(long)]
    source: Option<String>,
    #[arg(long = "type")]
    document_type: Option<String>,
    /// Chunk the document right after storing it
    #[arg(long)]
    process: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    ragdesk::init_tracing(if cli.verbose { "info,ragdesk=debug" } else { "info" });

    match cli.command {
        Command::Init => init(cli.data_dir),
        command => {
            let handles = ragdesk::build_environment(cli.data_dir)
                .context("failed to bootstrap ragdesk environment")?;
            run(&handles, command)
        }
    }
}

fn run(handles: &AppHandles, command: Command) -> Result<()> {
    let documents = &handles.documents;
    let rag = &handles.rag;

    match command {
        Command::Init => init(Some(handles.data_dir.clone()))?,
        Command::Doc(command) => match command {
            DocCommand::Add(args) => {
                let content = read_content(args.content, args.file.as_ref())?
                    .unwrap_or_default();
                let document = documents.create(CreateDocumentRequest {
                    title: args.title,
                    content,
                    source: args.source,
                    document_type: args.document_type,
                })?;
                if args.process {
                    let report = documents.process(document.id, ProcessDocumentRequest::default())?;
                    print_json(&json!({ "document": document, "processing": report }))?;
                } else {
                    print_json(&document)?;
                }
            }
            DocCommand::List { skip, limit } => print_json(&documents.list(skip, limit)?)?,
            DocCommand::Show { id } => print_json(&documents.get(id)?)?,
            DocCommand::Update {
                id,
                title,
                content,
                file,
                source,
                document_type,
            } => {
                let content = read_content(content, file.as_ref())?;
                let updated = documents.update(
                    id,
                    UpdateDocumentRequest {
                        title,
                        content,
                        source,
                        document_type,
                    },
                )?;
                print_json(&updated)?;
            }
            DocCommand::Delete { id } => {
                documents.delete(id)?;
                print_json(&json!({ "deleted": id }))?;
            }
            DocCommand::Process {
                id,
                chunk_size,
                chunk_overlap,
            } => {
                let report = documents.process(
                    id,
                    ProcessDocumentRequest {
                        chunk_size,
                        chunk_overlap,
                    },
                )?;
                print_json(&report)?;
            }
            DocCommand::Chunks { id } => print_json(&documents.chunks(id)?)?,
            DocCommand::AddChunk { id, content, order } => {
                let chunk = documents.add_chunk(CreateChunkRequest {
                    document_id: id,
                    content,
                    chunk_order: order,
                })?;
                print_json(&chunk)?;
            }
        },
        Command::Search { query, top_k } => print_json(&rag.search(&query, top_k)?)?,
        Command::Ask {
            query,
            max_chunks,
            temperature,
            no_sources,
        } => {
            let response = rag.ask(QueryRequest {
                query,
                max_chunks,
                temperature,
                include_sources: !no_sources,
            })?;
            print_json(&response)?;
        }
        Command::History { limit } => print_json(&rag.recent_queries(limit)?)?,
        Command::Health => print_json(&rag.health()?)?,
    }

    Ok(())
}

fn init(data_dir: Option<PathBuf>) -> Result<()> {
    let data_dir = match data_dir {
        Some(dir) => dir,
        None => ragdesk::resolve_data_dir()?,
    };
    let manager = ConfigManager::load(&data_dir).context("failed to load config file")?;
    let created = !manager.exists();
    if created {
        manager
            .persist(&manager.current())
            .context("failed to write config file")?;
    }
    print_json(&json!({
        "config": manager.path(),
        "created": created,
    }))
}

fn read_content(inline: Option<String>, file: Option<&PathBuf>) -> Result<Option<String>> {
    match (inline, file) {
        (Some(_), Some(_)) => bail!("pass either --content or --file, not both"),
        (Some(text), None) => Ok(Some(text)),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))
            .map(Some),
        (None, None) => Ok(None),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
