//! Simone CLI: analyze podcast transcripts and explore the results.
//!
//! Usage:
//!   simone analyze <path>... [--depth quick|standard|deep]
//!   simone stats | concepts [name] | path <from> <to>
//!   simone insights [--topic t] | ask <question>
//!   simone export [--format json|csv] [--with-insights]
//!   simone cache stats|clear

use clap::{Parser, Subcommand};
use serde::Serialize;
use simone::{
    AnalysisDepth, Config, ConceptMap, Episode, ExportFormat, SearchField, SimoneEngine,
    SimoneResult, TranscriptInput,
};
use simone::data::{slugify, EpisodeSource};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "simone",
    version,
    about = "Philosophical analysis of podcast transcripts"
)]
struct Cli {
    /// Path to a YAML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze transcript files or directories of `*.txt` transcripts
    Analyze {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// quick, standard or deep
        #[arg(long, default_value = "standard")]
        depth: AnalysisDepth,
        /// Episode id (single file only; defaults to the file name slug)
        #[arg(long)]
        id: Option<String>,
        /// Episode title (single file only; defaults to the file stem)
        #[arg(long)]
        title: Option<String>,
    },
    /// Re-run analysis over a stored episode
    Reanalyze {
        id: String,
        #[arg(long, default_value = "standard")]
        depth: AnalysisDepth,
    },
    /// Corpus statistics
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Concept overview, or detail for one concept
    Concepts {
        name: Option<String>,
        /// Print node/edge lists for a graph renderer
        #[arg(long, conflicts_with = "name")]
        graph: bool,
        #[arg(long)]
        json: bool,
    },
    /// Shortest connection between two concepts
    Path { from: String, to: String },
    /// Cross-episode insights
    Insights {
        #[arg(long)]
        topic: Option<String>,
        /// Restrict to these episodes (repeatable)
        #[arg(long = "episode")]
        episodes: Vec<String>,
    },
    /// Ask a question about the podcast's content
    Ask {
        question: String,
        /// Answer from this episode only
        #[arg(long)]
        episode: Option<String>,
    },
    /// Search episodes
    Search {
        query: String,
        /// all, title, transcript or concepts
        #[arg(long, default_value = "all")]
        field: SearchField,
    },
    /// Export every episode
    Export {
        /// json or csv
        #[arg(long, default_value = "json")]
        format: ExportFormat,
        /// Output file (defaults to the exports directory)
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Add cross-episode insights to a JSON export (calls the model)
        #[arg(long)]
        with_insights: bool,
    },
    /// Manage the reply cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Entry count and size
    Stats,
    /// Delete every cached reply
    Clear,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{}", text);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn report<T>(result: SimoneResult<T>, on_ok: impl FnOnce(T) -> i32) -> i32 {
    match result {
        Ok(value) => on_ok(value),
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn print_episode_line(episode: &Episode) {
    let m = &episode.analysis.metrics;
    println!(
        "{:<32}  {:<9}  {:>3} concepts  complexity {:>5.2}  {}",
        episode.id,
        episode.analysis.status.as_str(),
        m.concepts_count,
        m.complexity_score,
        episode.title
    );
}

fn file_input(path: &Path, id: Option<String>, title: Option<String>) -> std::io::Result<TranscriptInput> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let transcript = std::fs::read_to_string(path)?;
    let source = EpisodeSource {
        filename: path.file_name().map(|n| n.to_string_lossy().into_owned()),
        ..Default::default()
    };
    Ok(TranscriptInput::new(
        id.unwrap_or_else(|| slugify(&stem)),
        title.unwrap_or(stem),
        transcript,
    )
    .with_source(source))
}

async fn cmd_analyze(
    engine: &SimoneEngine,
    paths: &[PathBuf],
    depth: AnalysisDepth,
    id: Option<String>,
    title: Option<String>,
) -> i32 {
    if paths.len() > 1 && (id.is_some() || title.is_some()) {
        eprintln!("Error: --id and --title apply to a single file only");
        return 1;
    }

    let mut results = Vec::new();
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            match engine.analyze_directory(path, depth).await {
                Ok(r) => results.extend(r),
                Err(e) => {
                    eprintln!("Error: {}: {}", path.display(), e);
                    return 1;
                }
            }
        } else {
            match file_input(path, id.clone(), title.clone()) {
                Ok(input) => files.push(input),
                Err(e) => {
                    eprintln!("Error: cannot read '{}': {}", path.display(), e);
                    return 1;
                }
            }
        }
    }
    if !files.is_empty() {
        match engine.analyze_batch(files, depth).await {
            Ok(r) => results.extend(r),
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        }
    }

    if results.is_empty() {
        println!("No transcripts found.");
        return 0;
    }
    let mut failed = 0;
    for result in &results {
        match result {
            Ok(episode) => print_episode_line(episode),
            Err(e) => {
                failed += 1;
                eprintln!("Error: {}", e);
            }
        }
    }
    println!("Analyzed {} of {} transcripts", results.len() - failed, results.len());
    if failed > 0 {
        1
    } else {
        0
    }
}

async fn cmd_stats(engine: &SimoneEngine, json: bool) -> i32 {
    let stats = engine.statistics().await;
    if json {
        return print_json(&stats);
    }
    println!("Episodes:             {}", stats.total_episodes);
    println!("  valid:              {}", stats.valid_episodes);
    println!("  failed:             {}", stats.failed_episodes);
    println!("Unique concepts:      {}", stats.unique_concepts);
    println!("Unique philosophers:  {}", stats.unique_philosophers);
    println!("Average complexity:   {:.2}", stats.average_complexity);
    println!("Concepts per episode: {:.2}", stats.average_concepts_per_episode);
    0
}

async fn cmd_concepts(engine: &SimoneEngine, name: Option<&str>, graph: bool, json: bool) -> i32 {
    if graph {
        return print_json(&engine.visualization().await);
    }
    report(engine.concept_map(name).await, |map| {
        if json {
            return print_json(&map);
        }
        match map {
            ConceptMap::Overview(o) => {
                println!(
                    "{} concepts, {} relationships, density {:.3}",
                    o.total_concepts, o.total_relationships, o.density
                );
                println!("{:<32}  {:>8}", "CONCEPT", "EPISODES");
                println!("{}", "-".repeat(42));
                for c in &o.top_by_frequency {
                    println!("{:<32}  {:>8}", c.concept, c.count);
                }
                for (i, cluster) in o.clusters.iter().enumerate() {
                    println!(
                        "cluster {}: {} concepts around '{}'",
                        i + 1,
                        cluster.size,
                        cluster.central_concept
                    );
                }
            }
            ConceptMap::Concept(d) => {
                println!(
                    "{}: {} episodes, centrality {:.3}, clustering {:.3}",
                    d.concept, d.occurrences, d.centrality, d.clustering_coefficient
                );
                for ep in &d.episodes {
                    println!("  {}  {}", ep.episode_id, ep.title);
                }
                for r in &d.related_concepts {
                    println!("  related: {} ({})", r.concept, r.strength);
                }
            }
        }
        0
    })
}

async fn cmd_path(engine: &SimoneEngine, from: &str, to: &str) -> i32 {
    report(engine.concept_path(from, to).await, |path| match path {
        Some(path) => {
            println!("{}", path.path.join(" -> "));
            for hop in &path.hops {
                println!(
                    "  {} -> {}: {} shared episodes",
                    hop.from, hop.to, hop.strength
                );
            }
            0
        }
        None => {
            println!("No connection between '{}' and '{}'", from, to);
            1
        }
    })
}

async fn cmd_insights(engine: &SimoneEngine, topic: Option<&str>, episodes: &[String]) -> i32 {
    let ids = (!episodes.is_empty()).then_some(episodes);
    report(engine.generate_insights(topic, ids).await, |insights| {
        print_json(&insights)
    })
}

async fn cmd_ask(engine: &SimoneEngine, question: &str, episode: Option<&str>) -> i32 {
    report(engine.ask(question, episode).await, |answer| {
        println!("{}", answer.answer);
        if !answer.sources.is_empty() {
            println!();
            println!("Sources:");
            for source in &answer.sources {
                println!("  {}  {}", source.episode_id, source.title);
            }
        }
        0
    })
}

async fn cmd_search(engine: &SimoneEngine, query: &str, field: SearchField) -> i32 {
    let found = engine.search(query, field).await;
    if found.is_empty() {
        println!("No episodes match '{}'.", query);
        return 0;
    }
    for episode in &found {
        print_episode_line(episode);
    }
    0
}

async fn cmd_export(
    engine: &SimoneEngine,
    format: ExportFormat,
    output: Option<&Path>,
    with_insights: bool,
) -> i32 {
    report(engine.export(format, output, with_insights).await, |path| {
        println!("Exported {} to {}", format, path.display());
        0
    })
}

fn cmd_cache(engine: &SimoneEngine, action: &CacheAction) -> i32 {
    match action {
        CacheAction::Stats => report(engine.cache_stats(), |stats| {
            println!("Entries: {}", stats.entries);
            println!("Size:    {} bytes", stats.total_bytes);
            if let Some(location) = &stats.location {
                println!("Path:    {}", location.display());
            }
            0
        }),
        CacheAction::Clear => report(engine.clear_cache(), |removed| {
            println!("Removed {} cached replies", removed);
            0
        }),
    }
}

async fn run(cli: Cli, config: Config) -> i32 {
    let engine = match SimoneEngine::from_config(&config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    match &cli.command {
        Commands::Analyze {
            paths,
            depth,
            id,
            title,
        } => cmd_analyze(&engine, paths, *depth, id.clone(), title.clone()).await,
        Commands::Reanalyze { id, depth } => {
            report(engine.reanalyze_episode(id, *depth).await, |episode| {
                print_episode_line(&episode);
                0
            })
        }
        Commands::Stats { json } => cmd_stats(&engine, *json).await,
        Commands::Concepts { name, graph, json } => {
            cmd_concepts(&engine, name.as_deref(), *graph, *json).await
        }
        Commands::Path { from, to } => cmd_path(&engine, from, to).await,
        Commands::Insights { topic, episodes } => {
            cmd_insights(&engine, topic.as_deref(), episodes).await
        }
        Commands::Ask { question, episode } => {
            cmd_ask(&engine, question, episode.as_deref()).await
        }
        Commands::Search { query, field } => cmd_search(&engine, query, *field).await,
        Commands::Export {
            format,
            output,
            with_insights,
        } => cmd_export(&engine, *format, output.as_deref(), *with_insights).await,
        Commands::Cache { action } => cmd_cache(&engine, action),
    }
}

fn main() {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    init_logging(&config.logging.level);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };
    let code = rt.block_on(run(cli, config));
    std::process::exit(code);
}
