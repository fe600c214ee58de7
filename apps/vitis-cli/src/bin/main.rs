use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vitis_core::config::{Config, Settings};
use vitis_core::data_processor::DataProcessor;
use vitis_embed::get_default_embedder;
use vitis_rag::{ChatLog, Conversation, DiskLoader, GeminiClient, GenerationError, Generator, InMemoryChatLog, RagService};
use vitis_text::LexicalIndexer;
use vitis_vector::LanceDbIndexer;

const EMBED_BATCH: usize = 32;
const USAGE: &str = "Usage: vitis <ingest [kb_dir] | ask <question> [--session S] [--room R] | chat [--session S] [--room R] | diagnose <label> <confidence> | search <query> | status>";

/// Stands in for the model client when no API key is configured.
struct Unconfigured(String);

impl Generator for Unconfigured {
    fn generate(&self, _prompt: &str) -> Result<String, GenerationError> { Err(GenerationError::MissingApiKey(self.0.clone())) }
}

struct Args {
    positional: Vec<String>,
    session: String,
    room: String,
}

fn parse_args() -> (String, Args) {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() { eprintln!("{USAGE}"); std::process::exit(1); }
    let cmd = args.remove(0);
    let mut parsed = Args { positional: Vec::new(), session: "cli".to_string(), room: "default".to_string() };
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            flag @ ("--session" | "--room") => {
                let Some(value) = args.get(i + 1) else { eprintln!("Error: {flag} requires a value"); std::process::exit(1) };
                if flag == "--session" { parsed.session = value.clone(); } else { parsed.room = value.clone(); }
                i += 1;
            }
            other => parsed.positional.push(other.to_string()),
        }
        i += 1;
    }
    (cmd, parsed)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).with_writer(io::stderr).init();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {e:#}"); e })?;
    let settings = config.settings()?;
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "ingest" => {
            let kb_dir = args.positional.first().map_or_else(|| settings.data.kb_path(), PathBuf::from);
            ingest(&settings, kb_dir)?;
        }
        "ask" => {
            let question = args.positional.join(" ");
            if question.trim().is_empty() { bail!("Usage: vitis ask \"<question>\" [--session S] [--room R]"); }
            let conversation = conversation(&settings);
            println!("{}", conversation.handle_text(&args.session, &args.room, &question)?);
        }
        "chat" => chat(&conversation(&settings), &args.session, &args.room)?,
        "diagnose" => {
            let (Some(label), Some(confidence)) = (args.positional.first(), args.positional.get(1)) else {
                bail!("Usage: vitis diagnose <label> <confidence>");
            };
            let confidence: f32 = confidence.parse().map_err(|_| anyhow::anyhow!("confidence must be a number, got '{confidence}'"))?;
            let reply = conversation(&settings).handle_classification(&args.session, &args.room, label, confidence)?;
            println!("{}\n\n{}", reply.summary, reply.answer);
        }
        "search" => {
            let query = args.positional.join(" ");
            let service = service(&settings);
            let Some(results) = service.retrieve(&query) else { bail!("retrieval unavailable: {:?}", service.status()) };
            println!("mode: {:?}, {} chunks", results.mode, results.len());
            for (i, c) in results.chunks.iter().enumerate() {
                let title = c.chunk.title().unwrap_or("");
                println!("{:2}. {:.5}  {} {}  (vector #{}, lexical #{})", i + 1, c.score, c.chunk.id, title, rank(c.vector_rank), rank(c.lexical_rank));
            }
        }
        "status" => println!("{:?}", service(&settings).ensure_initialized()),
        _ => { eprintln!("Unknown command: {cmd}\n{USAGE}"); std::process::exit(1); }
    }
    Ok(())
}

fn rank(r: Option<usize>) -> String { r.map_or_else(|| "-".to_string(), |r| r.to_string()) }

fn ingest(settings: &Settings, kb_dir: PathBuf) -> Result<()> {
    println!("Ingesting knowledge base from {}", kb_dir.display());
    let chunks = DataProcessor::new().process_directory(&kb_dir)?;
    let embedder = get_default_embedder(&settings.embed)?;

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let pb = ProgressBar::new(texts.len() as u64);
    pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} embedded")?.progress_chars("#>-"));
    let mut embeddings = Vec::with_capacity(texts.len());
    for batch in texts.chunks(EMBED_BATCH) {
        embeddings.extend(embedder.embed_batch(batch)?);
        pb.inc(batch.len() as u64);
    }
    pb.finish_and_clear();

    let vector_dir = settings.data.vector_path();
    tokio::runtime::Runtime::new()?.block_on(async {
        let indexer = LanceDbIndexer::create(&vector_dir, &settings.data.table_name).await?;
        indexer.index(&chunks, &embeddings, embedder.dim()).await
    })?;
    let lexical_dir = settings.data.lexical_path();
    LexicalIndexer::create(&lexical_dir)?.index(&chunks)?;

    println!("✅ Ingest complete ({} chunks)", chunks.len());
    println!("   vector index:  {}", vector_dir.display());
    println!("   lexical index: {}", lexical_dir.display());
    Ok(())
}

fn generator(settings: &Settings) -> Arc<dyn Generator> {
    match GeminiClient::from_env(&settings.llm) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            warn!(error = %e, "generation client not configured; answers will be apologies");
            Arc::new(Unconfigured(settings.llm.api_key_env.clone()))
        }
    }
}

fn service(settings: &Settings) -> Arc<RagService> {
    let loader = DiskLoader::new(settings.data.clone(), settings.embed.clone());
    Arc::new(RagService::new(Box::new(loader), generator(settings), settings.retrieval))
}

fn conversation(settings: &Settings) -> Conversation {
    let log: Arc<dyn ChatLog> = Arc::new(InMemoryChatLog::new());
    Conversation::new(service(settings), log, settings.chat)
}

/// Line-based session. `/diagnose <label> <confidence>` feeds a classifier result.
fn chat(conversation: &Conversation, session: &str, room: &str) -> Result<()> {
    info!(session, room, "chat started");
    println!("Ketik pertanyaan, `/diagnose <label> <confidence>`, atau `/exit`.");
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 { break; }
        let line = line.trim();
        if line.is_empty() { continue; }
        if line == "/exit" { break; }
        if let Some(rest) = line.strip_prefix("/diagnose") {
            let mut parts = rest.split_whitespace();
            let (Some(label), Some(Ok(confidence))) = (parts.next(), parts.next().map(str::parse::<f32>)) else {
                println!("Format: /diagnose <label> <confidence>");
                continue;
            };
            match conversation.handle_classification(session, room, label, confidence) {
                Ok(reply) => println!("{}\n\n{}\n", reply.summary, reply.answer),
                Err(e) => println!("Error: {e:#}"),
            }
            continue;
        }
        match conversation.handle_text(session, room, line) {
            Ok(answer) => println!("{answer}\n"),
            Err(e) => println!("Error: {e:#}"),
        }
    }
    Ok(())
}
