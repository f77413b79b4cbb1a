use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use sieve::classifier::summary::label_distribution;
use sieve::classifier::Label;
use sieve::comments::loader::load_comments;
use sieve::config::Config;
use sieve::db::{self, queries};
use sieve::features::{FeatureExtractor, FeatureVector};
use sieve::output::{export, terminal};
use sieve::pipeline::{classify, extract};
use sieve::topics::{run_sweep, select_optimal_k, FileCoherenceSource, KRange};

/// Sieve: unsupervised comment quality/spam classification.
///
/// Clusters comments into quality, spam and uncertain groups from surface
/// features, and picks a topic count from coherence sweeps.
#[derive(Parser)]
#[command(name = "sieve", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Extract feature vectors without clustering
    Extract {
        /// Comment file (.csv export or .jsonl)
        #[arg(long)]
        input: PathBuf,

        /// Write features as JSON here instead of printing a summary
        #[arg(long)]
        output: Option<PathBuf>,

        /// Extraction workers (default: SIEVE_CONCURRENCY or available cores)
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Fit the cluster model on a corpus and classify every comment
    Classify {
        /// Comment file (.csv export or .jsonl)
        #[arg(long)]
        input: PathBuf,

        /// Mixture components: 2 or 3
        #[arg(long)]
        components: Option<usize>,

        /// Seed for the k-means initialization
        #[arg(long)]
        seed: Option<u64>,

        /// EM restarts; the best lower bound wins
        #[arg(long)]
        n_init: Option<usize>,

        /// Relabel results at or below this confidence as uncertain
        #[arg(long)]
        uncertain_below: Option<f64>,

        /// Extraction workers
        #[arg(long)]
        concurrency: Option<usize>,

        /// Print results without writing to the database
        #[arg(long)]
        no_store: bool,
    },

    /// Classify new comments against the stored model
    Rescore {
        /// Comment file (.csv export or .jsonl)
        #[arg(long)]
        input: PathBuf,

        /// Extraction workers
        #[arg(long)]
        concurrency: Option<usize>,

        /// Print results without writing to the database
        #[arg(long)]
        no_store: bool,
    },

    /// Show top samples per label and low-confidence review candidates
    Report {
        /// Samples per label (default: 5)
        #[arg(long, default_value = "5")]
        limit: u32,
    },

    /// Pick the optimal topic count from precomputed coherence scores
    SelectK {
        /// Coherence file (.csv with num_topics,coherence_score or .json)
        #[arg(long)]
        input: PathBuf,

        /// Flag optima that gain less than this over smaller K
        #[arg(long)]
        min_improvement: Option<f64>,

        /// Scores within this distance of the best count as tied
        #[arg(long, default_value = "1e-6")]
        tie_tolerance: f64,

        /// Only sweep K from this value (requires --to)
        #[arg(long, requires = "to")]
        from: Option<u32>,

        /// Only sweep K up to this value (requires --from)
        #[arg(long, requires = "from")]
        to: Option<u32>,

        /// Step between swept K values
        #[arg(long, default_value = "2")]
        step: u32,
    },

    /// Write the dashboard JSON export
    Export {
        /// Output path
        #[arg(long)]
        output: PathBuf,

        /// Samples per label (default: 5)
        #[arg(long, default_value = "5")]
        limit: u32,
    },

    /// Show system status (DB stats, stored model, last runs)
    Status,
}

#[derive(Serialize)]
struct FeatureRow<'a> {
    comment_id: &'a str,
    features: FeatureVector,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("sieve=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            info!("Initializing Sieve database...");
            let config = Config::load()?;
            let conn = db::initialize(&config.db_path)?;
            let table_count = db::schema::table_count(&conn)?;
            println!("Database initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            println!("\nNext step: sieve classify --input <comments.csv>");
        }

        Commands::Extract {
            input,
            output,
            concurrency,
        } => {
            let config = Config::load()?;
            let comments = load_comments(&input)?;
            let extractor = FeatureExtractor::for_corpus(&comments);
            let features = extract::extract_parallel(
                &comments,
                extractor,
                concurrency.unwrap_or(config.concurrency),
                true,
            )
            .await?;

            match output {
                Some(path) => {
                    let rows: Vec<FeatureRow> = comments
                        .iter()
                        .zip(&features)
                        .map(|(c, f)| FeatureRow {
                            comment_id: &c.id,
                            features: *f,
                        })
                        .collect();
                    let json = serde_json::to_string_pretty(&rows)?;
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Wrote {} feature vectors to {}", rows.len(), path.display());
                }
                None => print_feature_means(&features),
            }
        }

        Commands::Classify {
            input,
            components,
            seed,
            n_init,
            uncertain_below,
            concurrency,
            no_store,
        } => {
            let mut config = Config::load()?;
            if let Some(c) = components {
                config.components = c;
            }
            if let Some(s) = seed {
                config.seed = s;
            }
            if let Some(n) = n_init {
                config.n_init = n;
            }
            if uncertain_below.is_some() {
                config.uncertain_below = uncertain_below;
            }
            let classifier_config = config.classifier()?;

            let comments = load_comments(&input)?;
            println!(
                "Classifying {} comments with {} components...",
                comments.len(),
                classifier_config.components
            );
            let run = classify::run(
                comments,
                classifier_config,
                concurrency.unwrap_or(config.concurrency),
                true,
            )
            .await?;

            terminal::display_components(&run.saved.model.components);
            terminal::display_distribution(&label_distribution(&run.results()));

            if no_store {
                println!("\n{}", "Not stored (--no-store).".dimmed());
            } else {
                let conn = db::initialize(&config.db_path)?;
                let model_id = queries::replace_fitted_run(&conn, &run.saved, &run.classified)?;
                let saved = run.classified.len();
                queries::set_run_state(&conn, "last_classify_at", &now())?;
                queries::set_run_state(&conn, "last_classify_input", &input.display().to_string())?;
                println!("\nStored model #{model_id} and {saved} classifications.");
            }
        }

        Commands::Rescore {
            input,
            concurrency,
            no_store,
        } => {
            let config = Config::load()?;
            let conn = db::open(&config.db_path)?;
            let stored = queries::latest_model(&conn)?
                .context("No stored model. Run `sieve classify` first.")?;

            let comments = load_comments(&input)?;
            println!(
                "Rescoring {} comments against model #{} (fitted {})...",
                comments.len(),
                stored.id,
                stored.fitted_at
            );
            let classified = classify::rescore(
                comments,
                &stored.saved,
                concurrency.unwrap_or(config.concurrency),
                true,
            )
            .await?;

            let results: Vec<_> = classified.iter().map(|c| c.result.clone()).collect();
            terminal::display_distribution(&label_distribution(&results));

            if no_store {
                println!("\n{}", "Not stored (--no-store).".dimmed());
            } else {
                let saved = queries::save_classifications(&conn, &classified, Some(stored.id))?;
                queries::set_run_state(&conn, "last_rescore_at", &now())?;
                println!("\nStored {saved} classifications.");
            }
        }

        Commands::Report { limit } => {
            let config = Config::load()?;
            let conn = db::open(&config.db_path)?;
            if queries::classification_count(&conn)? == 0 {
                println!("No classifications stored yet. Run `sieve classify --input <file>` first.");
                return Ok(());
            }

            if let Some(model) = queries::latest_model(&conn)? {
                terminal::display_components(&model.saved.model.components);
            }
            for label in [Label::Spam, Label::Quality, Label::Uncertain] {
                let samples = queries::classifications_by_label(&conn, label, limit)?;
                terminal::display_samples(label, &samples);
            }
            let review = queries::lowest_confidence(&conn, limit)?;
            terminal::display_review_candidates(&review);
        }

        Commands::SelectK {
            input,
            min_improvement,
            tie_tolerance,
            from,
            to,
            step,
        } => {
            let config = Config::load()?;
            let source = FileCoherenceSource::load(&input)?;
            let records = match (from, to) {
                (Some(from), Some(to)) => run_sweep(&source, &KRange::new(from, to, step)?)?,
                _ => source.records(),
            };

            let mut selector = config.selector();
            selector.tie_tolerance = tie_tolerance;
            if min_improvement.is_some() {
                selector.min_improvement = min_improvement;
            }
            let selection = select_optimal_k(&records, &selector)?;
            terminal::display_coherence_chart(&records, &selection);

            let conn = db::initialize(&config.db_path)?;
            queries::save_topic_selection(&conn, &records, &selection)?;
        }

        Commands::Export { output, limit } => {
            let config = Config::load()?;
            let conn = db::open(&config.db_path)?;
            let dashboard = export::build(&conn, limit, &config.selector())?;
            export::write(&dashboard, &output)?;
            queries::set_run_state(&conn, "last_export_at", &now())?;
            println!(
                "Exported {} classifications and {} coherence points to {}",
                dashboard.distribution.total,
                dashboard.coherence.len(),
                output.display()
            );
        }

        Commands::Status => {
            let config = Config::load()?;
            let conn = if Path::new(&config.db_path).exists() {
                Some(db::open(&config.db_path)?)
            } else {
                None
            };
            sieve::status::show(conn.as_ref(), &config.db_path)?;
        }
    }

    Ok(())
}

fn now() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Corpus-wide feature means, for a quick look without writing a file.
fn print_feature_means(features: &[FeatureVector]) {
    println!(
        "\n{}",
        format!("=== Feature means ({} comments) ===", features.len()).bold()
    );
    if features.is_empty() {
        return;
    }
    let n = features.len() as f64;
    for (i, name) in FeatureVector::NAMES.iter().enumerate() {
        let mean = features.iter().map(|f| f.to_array()[i]).sum::<f64>() / n;
        println!("  {:<18} {:>10.4}", name, mean);
    }
}
