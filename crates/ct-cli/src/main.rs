//! Claim Test CLI

use clap::{Parser, Subcommand};
use ct_client::HttpClaimsApi;
use ct_core::corpus::{self, TestCase, TestIntent};
use ct_core::report::{self, ReportFormat, RunReport};
use ct_core::{HarnessConfig, Orchestrator, Run};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "claimtest")]
#[command(about = "Scripted test runs against a claims adjudication service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Harness configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample the corpus and run every selected case
    Run {
        /// Path to corpus file (JSON array of test cases)
        #[arg(long)]
        corpus: PathBuf,

        /// Cases per polarity per intervention (overrides config)
        #[arg(long)]
        cap: Option<usize>,

        /// Seed for reproducible sampling
        #[arg(long)]
        seed: Option<u64>,

        /// Run the whole corpus instead of a sample
        #[arg(long)]
        all: bool,

        /// Output format (json, markdown)
        #[arg(short, long, default_value = "markdown")]
        output: String,

        /// Output file (defaults to stdout)
        #[arg(short = 'O', long)]
        output_file: Option<PathBuf>,
    },

    /// Run one case from the corpus
    Single {
        #[arg(long)]
        corpus: PathBuf,

        /// Test case id
        #[arg(long)]
        id: String,
    },

    /// Re-evaluate a submitted claim without resubmitting it
    Refresh {
        #[arg(long)]
        claim_id: String,

        /// Intent to judge against (positive, negative, build, complex)
        #[arg(long, default_value = "positive")]
        intent: String,
    },

    /// Show corpus grouping by intervention
    Groups {
        #[arg(long)]
        corpus: PathBuf,
    },

    /// Print a sample without running it
    Sample {
        #[arg(long)]
        corpus: PathBuf,

        #[arg(long)]
        cap: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set subscriber: {}", e);
    }

    let config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Run { corpus, cap, seed, all, output, output_file } => {
            cmd_run(&config, &corpus, cap, seed, all, &output, output_file).await;
        }
        Commands::Single { corpus, id } => {
            cmd_single(&config, &corpus, &id).await;
        }
        Commands::Refresh { claim_id, intent } => {
            cmd_refresh(&config, &claim_id, &intent).await;
        }
        Commands::Groups { corpus } => {
            cmd_groups(&corpus);
        }
        Commands::Sample { corpus, cap, seed } => {
            cmd_sample(&config, &corpus, cap, seed);
        }
    }
}

fn load_config(path: Option<&Path>) -> HarnessConfig {
    let config = match path {
        Some(path) => match HarnessConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load config {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => HarnessConfig::default(),
    };
    config.with_env_overrides()
}

fn load_cases(path: &Path) -> Vec<TestCase> {
    match corpus::load_corpus(path) {
        Ok(cases) => cases,
        Err(e) => {
            error!("Failed to load corpus: {}", e);
            std::process::exit(1);
        }
    }
}

fn build_orchestrator(config: &HarnessConfig) -> Orchestrator {
    let api = match HttpClaimsApi::new(config) {
        Ok(api) => Arc::new(api),
        Err(e) => {
            error!("Failed to create API client: {}", e);
            std::process::exit(1);
        }
    };

    let mut builder = Orchestrator::builder(api.clone())
        .config(config)
        .submitter(api.clone())
        .result_store(api.clone());
    if config.ensure_related_resources {
        builder = builder.resource_registry(api);
    }
    builder.build()
}

fn rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

async fn cmd_run(
    config: &HarnessConfig,
    corpus_path: &Path,
    cap: Option<usize>,
    seed: Option<u64>,
    all: bool,
    output_format: &str,
    output_file: Option<PathBuf>,
) {
    let cases = load_cases(corpus_path);

    let mut run = if all {
        Run::admit(&cases)
    } else {
        let groups = corpus::group(&cases);
        let cap = cap.unwrap_or(config.cap_per_polarity);
        Run::admit(corpus::sample(&groups, cap, &mut rng(seed)))
    };
    info!("Admitted {} of {} test cases", run.len(), cases.len());

    let orchestrator = build_orchestrator(config);
    let summary = match orchestrator.run_batch(&mut run).await {
        Ok(summary) => summary,
        Err(e) => {
            error!("Run failed: {}", e);
            std::process::exit(1);
        }
    };

    let format = match output_format.to_lowercase().as_str() {
        "json" => ReportFormat::Json,
        _ => ReportFormat::Markdown,
    };

    match report::generate_report(&RunReport::from_run(&run), format) {
        Ok(content) => {
            if let Some(out_path) = output_file {
                if let Err(e) = std::fs::write(&out_path, &content) {
                    error!("Failed to write {}: {}", out_path.display(), e);
                    std::process::exit(1);
                }
                info!("Report written to: {}", out_path.display());
            } else {
                println!("{}", content);
            }
        }
        Err(e) => {
            error!("Failed to generate report: {}", e);
            std::process::exit(1);
        }
    }

    if summary.failed > 0 {
        std::process::exit(1);
    }
}

async fn cmd_single(config: &HarnessConfig, corpus_path: &Path, id: &str) {
    let cases = load_cases(corpus_path);
    let mut run = Run::admit(cases.iter().filter(|c| c.id == id));

    let orchestrator = build_orchestrator(config);
    match orchestrator.run_single(&mut run, id).await {
        Ok(result) => {
            println!("\n{}: {}", result.name, result.status.to_string().to_uppercase());
            println!("  Claim:   {}", result.claim_id);
            println!("  Outcome: {}", result.outcome);
            println!("  {}", result.message);
            if !result.status.is_passed() {
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("Test case {} could not run: {}", id, e);
            std::process::exit(1);
        }
    }
}

async fn cmd_refresh(config: &HarnessConfig, claim_id: &str, intent: &str) {
    let intent: TestIntent = match intent.parse() {
        Ok(intent) => intent,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let orchestrator = build_orchestrator(config);
    match orchestrator.resolver().refresh(claim_id, intent).await {
        Ok(refreshed) => {
            println!("{}: {} ({})", claim_id, refreshed.status.to_string().to_uppercase(), refreshed.message);
        }
        Err(e) => {
            error!("Refresh failed for {}: {}", claim_id, e.describe());
            std::process::exit(1);
        }
    }
}

fn cmd_groups(corpus_path: &Path) {
    let cases = load_cases(corpus_path);
    let groups = corpus::group(&cases);

    println!("\nInterventions\n{}", "=".repeat(50));
    for (intervention, group) in &groups {
        println!(
            "{:<30} positive: {:>3}  negative: {:>3}",
            intervention,
            group.positive.len(),
            group.negative.len()
        );
    }
    let grouped: usize = groups.values().map(|g| g.len()).sum();
    println!("{}", "=".repeat(50));
    println!("{} interventions, {} of {} cases grouped", groups.len(), grouped, cases.len());
}

fn cmd_sample(config: &HarnessConfig, corpus_path: &Path, cap: Option<usize>, seed: Option<u64>) {
    let cases = load_cases(corpus_path);
    let groups = corpus::group(&cases);
    let cap = cap.unwrap_or(config.cap_per_polarity);

    for case in corpus::sample(&groups, cap, &mut rng(seed)) {
        println!(
            "{}\t{}\t{}\t{}",
            case.intervention_id.as_deref().unwrap_or("-"),
            case.intent(),
            case.id,
            case.display_name()
        );
    }
}
