use clap::{Parser, Subcommand};
use std::path::Path;

use representative_core::audit::{AuditLog, JsonLinesAuditLog, MemoryAuditLog};
use representative_core::config::{config_path, load_config, load_config_from, AppConfig};
use representative_core::resolve::{Outcome, RepresentativeResolver};
use representative_core::runner::{run_step, RunOptions, StepReport, StepReturn, STEP_TITLE};
use representative_core::store::{DocumentStore, JsonDocumentStore};
use representative_core::workflow::{JsonStepStore, MemoryStepStore, Step, StepStore};

#[derive(Parser)]
#[command(name = "representative-creation")]
#[command(about = "Choose and record the representative page of a digitized document")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the representative-creation step on a metadata file
    Run {
        /// Document metadata file (JSON)
        #[arg(required = true)]
        input: String,

        /// Workflow steps file (JSON array of steps)
        #[arg(long)]
        steps: Option<String>,

        /// Title of the step being executed
        #[arg(long, default_value = STEP_TITLE)]
        step: String,

        /// Process the document belongs to
        #[arg(long)]
        process_id: Option<u64>,

        /// Append audit entries to this file (JSON lines)
        #[arg(long)]
        audit_log: Option<String>,

        /// Structural element to take the representative page from
        #[arg(long)]
        element: Option<String>,

        /// Audit message when the structural element is missing
        #[arg(long)]
        error_message: Option<String>,

        /// Step to reopen when the structural element is missing
        #[arg(long)]
        fallback_step: Option<String>,

        /// Resolve without writing the document, steps, or audit log
        #[arg(long)]
        dry_run: bool,

        /// Config file to use instead of the default location
        #[arg(long)]
        config: Option<String>,
    },

    /// Show the current representative page of a metadata file
    Inspect {
        /// Document metadata file (JSON)
        #[arg(required = true)]
        input: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Initialize default config file
    Init,
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Key (dot-separated path)
        key: String,
        /// Value
        value: String,
    },
}

struct RunArgs<'a> {
    input: &'a str,
    steps: Option<&'a str>,
    step: &'a str,
    process_id: Option<u64>,
    audit_log: Option<&'a str>,
    element: Option<&'a str>,
    error_message: Option<&'a str>,
    fallback_step: Option<&'a str>,
    dry_run: bool,
    config: Option<&'a str>,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Run {
            input,
            steps,
            step,
            process_id,
            audit_log,
            element,
            error_message,
            fallback_step,
            dry_run,
            config,
        } => run_step_command(
            &RunArgs {
                input,
                steps: steps.as_deref(),
                step,
                process_id: *process_id,
                audit_log: audit_log.as_deref(),
                element: element.as_deref(),
                error_message: error_message.as_deref(),
                fallback_step: fallback_step.as_deref(),
                dry_run: *dry_run,
                config: config.as_deref(),
            },
            cli.json,
        ),
        Commands::Inspect { input } => run_inspect(input, cli.json),
        Commands::Config { action } => run_config(action, cli.json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_step_command(args: &RunArgs<'_>, json: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut cfg = match args.config {
        Some(p) => load_config_from(Path::new(p))?,
        None => load_config(),
    };
    if let Some(e) = args.element {
        cfg.resolver.structural_element = e.to_string();
    }
    if let Some(m) = args.error_message {
        cfg.resolver.error_message = Some(m.to_string());
    }
    if let Some(s) = args.fallback_step {
        cfg.resolver.fallback_step = Some(s.to_string());
    }
    let ruleset = cfg.ruleset();

    let audit: Box<dyn AuditLog> = match args.audit_log {
        Some(p) if !args.dry_run => Box::new(JsonLinesAuditLog::new(p)),
        _ => Box::new(MemoryAuditLog::new()),
    };

    let (step_store, current): (Box<dyn StepStore>, Step) = match args.steps {
        Some(p) => {
            let file = JsonStepStore::open(p)?;
            let process_id = args
                .process_id
                .or_else(|| file.steps().first().map(|s| s.process_id))
                .unwrap_or_default();
            let current = file.find(process_id, args.step)?;
            if args.dry_run {
                (Box::new(MemoryStepStore::new(file.steps())), current)
            } else {
                (Box::new(file), current)
            }
        }
        None => (
            Box::new(MemoryStepStore::default()),
            Step::new(0, args.process_id.unwrap_or_default(), args.step, 0),
        ),
    };

    tracing::info!(
        "Running step '{}' of process {} on {}",
        current.title,
        current.process_id,
        args.input
    );
    let store = JsonDocumentStore::new(args.input);
    let resolver = RepresentativeResolver::new(&cfg.resolver, &ruleset, audit.as_ref(), step_store.as_ref());
    let report = run_step(&store, &resolver, &current, &RunOptions { dry_run: args.dry_run })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, &cfg.resolver.structural_element, store.path());
    }
    if let Some(msg) = &report.audit_failure {
        eprintln!("Warning: could not write audit entry: {}", msg);
    }

    match (&report.result, &report.outcome) {
        (StepReturn::Finished, _) => Ok(()),
        (StepReturn::Aborted, Outcome::FallbackApplied { step }) => {
            Err(format!("Step not completed: workflow rolled back to '{}'", step).into())
        }
        (StepReturn::Failed, Outcome::FallbackFailed { step }) => {
            Err(format!("Fallback step '{}' not found before '{}'", step, current.title).into())
        }
        (result, _) => Err(format!("Step ended with {:?}", result).into()),
    }
}

fn print_report(report: &StepReport, element: &str, path: &Path) {
    match &report.outcome {
        Outcome::AlreadyAssigned { page } => println!("Representative page already set: {}", page),
        Outcome::Assigned(a) => {
            if report.saved {
                println!("Assigned representative page {} -> {}", a.page_number(), path.display());
            } else {
                println!("Would assign representative page {}", a.page_number());
            }
        }
        Outcome::NoStructure => println!("No {} found; nothing to do", element),
        Outcome::NoLinkedPages => println!("{} references no pages; nothing to do", element),
        Outcome::NoPageNumber => println!("First page of {} has no page number; nothing to do", element),
        Outcome::FallbackApplied { step } => println!("No {} found; reopened step '{}'", element, step),
        Outcome::FallbackFailed { step } => println!("No {} found; fallback step '{}' unavailable", element, step),
    }
}

fn run_inspect(input: &str, json: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let doc = JsonDocumentStore::new(input).load()?;
    let representative = doc.physical.representative();
    let page = representative.and_then(|n| doc.page_by_number(&n.to_string()));

    if json {
        let info = serde_json::json!({
            "representative": representative,
            "page": page.map(|p| p.id.as_str()),
            "pages": doc.physical.pages.len(),
            "root": doc.logical.type_name,
        });
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("Root: {}", doc.logical.type_name);
        println!("Pages: {}", doc.physical.pages.len());
        match (representative, page) {
            (Some(n), Some(p)) => println!("Representative: {} ({})", n, p.id),
            (Some(n), None) => println!("Representative: {} (no such page)", n),
            (None, _) => println!("Representative: none"),
        }
    }
    Ok(())
}

fn run_config(
    action: &ConfigAction,
    json: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    match action {
        ConfigAction::Init => {
            let path = config_path().ok_or("Could not determine config directory")?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let default_cfg = AppConfig::default();
            let toml = toml::to_string_pretty(&default_cfg)?;
            std::fs::write(&path, toml)?;
            println!("Wrote default config to {}", path.display());
        }
        ConfigAction::Show => {
            let cfg = load_config();
            if json {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            } else {
                println!("{}", toml::to_string_pretty(&cfg)?);
            }
        }
        ConfigAction::Set { key, value } => {
            let path = config_path().ok_or("Could not determine config directory")?;
            let mut cfg: AppConfig = if path.exists() {
                load_config_from(&path)?
            } else {
                AppConfig::default()
            };

            cfg.set(key, value)?;

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let toml = toml::to_string_pretty(&cfg)?;
            std::fs::write(&path, toml)?;
            if !json {
                println!("Updated {}", key);
            }
        }
    }
    Ok(())
}
