mod cli;
mod logging;

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use lexdb_core::config::{Config, IngestSettings};
use lexdb_core::data_processor::DataProcessor;
use lexdb_core::types::RankedResult;
use lexdb_engine::{build_context, format_reference, SearchEngine};

use cli::{Cli, Commands};

const INGEST_BATCH: usize = 64;

fn main() -> Result<()> {
    logging::init();
    let args = Cli::parse();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;

    let mut ingest = config.ingest()?;
    if let Some(dir) = &args.resources { ingest.resources_dir = dir.clone(); }
    if let Some(pattern) = &args.pattern { ingest.pattern = pattern.clone(); }
    ingest.validate()?;

    let engine = SearchEngine::new(config.search()?)?;
    ingest_resources(&engine, ingest, args.limit_files)?;

    let default_top_k = engine.settings().default_top_k;
    match args.command {
        Commands::Query { text, top_k, json } => run_query(&engine, &text, top_k.unwrap_or(default_top_k), json),
        Commands::Interactive { top_k } => run_interactive(&engine, top_k.unwrap_or(default_top_k)),
        Commands::Stats => {
            println!("chunks:      {}", engine.chunk_count());
            println!("vocabulary:  {}", engine.vocabulary_size());
            println!("exact index: {}", if engine.exact_index_enabled() { "enabled" } else { "disabled" });
            Ok(())
        }
    }
}

fn ingest_resources(engine: &SearchEngine, settings: IngestSettings, limit_files: Option<usize>) -> Result<()> {
    let data_dir = settings.resolved_resources_dir();
    let processor = DataProcessor::new(settings);
    let chunks = match limit_files {
        Some(limit) => processor.process_directory_limited(&data_dir, limit)?,
        None => processor.process_directory(&data_dir)?,
    };
    if chunks.is_empty() { return Ok(()); }

    let pb = ProgressBar::new(chunks.len() as u64);
    pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")?.progress_chars("#>-"));
    let mut indexed = 0;
    for batch in chunks.chunks(INGEST_BATCH) {
        indexed += engine.ingest_chunks(batch).context("ingesting chunks")?;
        pb.inc(batch.len() as u64);
    }
    pb.finish_with_message("indexed");
    tracing::info!(chunks = chunks.len(), indexed, dir = %data_dir.display(), "ingestion complete");
    Ok(())
}

fn run_query(engine: &SearchEngine, text: &str, top_k: usize, json: bool) -> Result<()> {
    let response = engine.search_detailed(text, top_k)?;
    if json {
        let out = serde_json::json!({ "query": text, "tier": response.tier, "results": response.results });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }
    match response.tier {
        Some(tier) => println!("🔍 {} results for \"{}\" (tier: {})", response.results.len(), text, tier),
        None => println!("🔍 No results for \"{}\"", text),
    }
    print_results(&response.results);
    Ok(())
}

fn print_results(results: &[RankedResult]) {
    for (i, r) in results.iter().enumerate() {
        println!("\n  {}. score={:.4}  id={}", i + 1, r.score, r.chunk_id);
        println!("     📄 {}", format_reference(&r.metadata));
    }
}

fn run_interactive(engine: &SearchEngine, top_k: usize) -> Result<()> {
    println!("Type a query, `:refs` for the sources of the last answer, `:quit` to exit.");
    let stdin = io::stdin();
    let mut last: Vec<RankedResult> = Vec::new();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 { break; }
        match line.trim() {
            "" => continue,
            ":quit" | ":q" => break,
            ":refs" => {
                if last.is_empty() { println!("No references yet."); }
                for r in &last { println!("  - {}", format_reference(&r.metadata)); }
            }
            query => match engine.search(query, top_k) {
                Ok(results) if results.is_empty() => {
                    println!("No matching documents.");
                    last.clear();
                }
                Ok(results) => {
                    println!("{}", build_context(engine, &results));
                    last = results;
                }
                Err(e) => println!("⚠️  {}", e),
            },
        }
    }
    Ok(())
}
