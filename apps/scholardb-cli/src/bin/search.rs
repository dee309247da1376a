use std::{env, fs, path::PathBuf, process};

use indicatif::{ProgressBar, ProgressStyle};
use scholardb_chunk::{ChunkerConfig, EnricherConfig, MetadataEnricher, SemanticChunker};
use scholardb_core::config::Config;
use scholardb_core::types::Chunk;
use scholardb_hybrid::{HybridConfig, HybridRetriever};
use scholardb_text::{Bm25Config, Bm25Index};
use scholardb_vector::{HashEmbedder, InMemoryVectorStore, VectorStoreAdapter};

const EMBED_DIM: usize = 256;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let mut data_dir = None;
    let mut top_k = None;
    let mut query_parts: Vec<String> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--top-k" | "-k" => {
                if let Some(k) = args.get(i + 1).and_then(|v| v.parse::<usize>().ok()) {
                    top_k = Some(k);
                    i += 1;
                } else {
                    eprintln!("Error: --top-k requires a number");
                    process::exit(1);
                }
            }
            _ if data_dir.is_none() && !args[i].starts_with('-') => {
                data_dir = Some(PathBuf::from(&args[i]));
            }
            _ if !args[i].starts_with('-') => query_parts.push(args[i].clone()),
            flag => eprintln!("Ignoring unknown flag: {flag}"),
        }
        i += 1;
    }

    let Some(data_dir) = data_dir else {
        eprintln!("Usage: scholardb-search <data_dir> <query...> [--top-k N]");
        process::exit(1);
    };
    if query_parts.is_empty() {
        eprintln!("Usage: scholardb-search <data_dir> <query...> [--top-k N]");
        process::exit(1);
    }
    let query = query_parts.join(" ");

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    let chunker_config: ChunkerConfig = config.get("chunking").unwrap_or_default();
    let hybrid_config: HybridConfig = config.get("retrieval").unwrap_or_default();

    println!("scholardb hybrid search\n=======================");
    println!("Data directory: {}", data_dir.display());

    let chunker = SemanticChunker::new(chunker_config)?;
    let enricher = MetadataEnricher::new(EnricherConfig::default())?;

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&data_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("txt"))
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    if files.is_empty() {
        println!("No .txt files found under {}.", data_dir.display());
        return Ok(());
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("#>-"),
    );

    let mut all_chunks: Vec<Chunk> = Vec::new();
    for file in &files {
        let content = fs::read_to_string(file)
            .unwrap_or_else(|_| String::from_utf8_lossy(&fs::read(file).unwrap_or_default()).to_string());
        let source = file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| file.display().to_string());
        let chunks = chunker.chunk(&content, &source);
        all_chunks.extend(enricher.enrich(&chunks, None));
        pb.inc(1);
    }
    pb.finish_with_message("chunked");
    println!("Processed {} files into {} chunks", files.len(), all_chunks.len());

    let bm25 = Bm25Index::new(Bm25Config::default())?;
    let vector = VectorStoreAdapter::new(
        Box::new(InMemoryVectorStore::new()),
        Box::new(HashEmbedder::new(EMBED_DIM)),
    );
    let mut retriever = HybridRetriever::new(bm25, vector, hybrid_config)?;
    retriever.index(&all_chunks)?;

    let results = retriever.retrieve(&query, top_k);
    if results.is_empty() {
        println!("No results for '{query}'.");
        return Ok(());
    }

    println!("\nTop {} results for '{query}':", results.len());
    for (rank, hit) in results.iter().enumerate() {
        let snippet: String = hit.text.chars().take(120).collect();
        println!(
            "{:>2}. [{:.5}] {} ({} / {})\n    {}",
            rank + 1,
            hit.score,
            hit.chunk_id,
            hit.metadata.source,
            hit.metadata.section.label(),
            snippet
        );
    }

    Ok(())
}
