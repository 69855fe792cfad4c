use clap::Parser;
use colored::*;
use eyre::{Context, Result, bail};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

mod cli;

use cli::{CacheCommands, Cli, Commands};
use fixloop::config::{ApprovalMode, Config};
use fixloop::diagnose::Classifier;
use fixloop::language::{Language, LanguageRegistry};
use fixloop::llm::{LlmClient, ProviderClient};
use fixloop::prompt::{FixPrompt, PromptLoader};
use fixloop::propose::FixProposer;
use fixloop::sandbox::{ContainerRunner, ExecutionResult, Sandbox};
use fixloop::session::{SessionOutcome, SessionRunner, SessionRunnerConfig, approver_for};
use fixloop::store::{FixCache, NoFixCache, SqliteFixCache};
use fixloop::workspace::WorkspaceManager;

fn setup_logging() -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fixloop")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("fixloop.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

/// Explicit `--language` wins; otherwise the file extension decides.
fn resolve_language(registry: &LanguageRegistry, file: &Path, flag: Option<&str>) -> Result<Language> {
    if let Some(tag) = flag {
        return tag.parse::<Language>().map_err(|e| eyre::eyre!("{}", e));
    }
    let ext = file.extension().and_then(|e| e.to_str()).unwrap_or_default();
    match registry.for_extension(ext) {
        Some(profile) => Ok(profile.language),
        None => bail!(
            "Cannot infer language of {}; pass --language (one of: {})",
            file.display(),
            Language::ALL.iter().map(|l| l.tag()).collect::<Vec<_>>().join(", ")
        ),
    }
}

fn build_registry(config: &Config) -> Result<Arc<LanguageRegistry>> {
    let registry = LanguageRegistry::with_overrides(&config.languages).context("Invalid language overrides")?;
    Ok(Arc::new(registry))
}

/// A cache that fails to open is replaced by no cache.
fn build_cache(config: &Config, disabled: bool) -> Arc<dyn FixCache> {
    if disabled || !config.cache.enabled {
        info!("Fix cache disabled");
        return Arc::new(NoFixCache);
    }
    match SqliteFixCache::open_at(&config.cache.path) {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            log::warn!("Failed to open fix cache at {}: {}", config.cache.path.display(), e);
            eprintln!("{} fix cache unavailable: {}", "Warning:".yellow(), e);
            Arc::new(NoFixCache)
        }
    }
}

fn build_prompt(config: &Config) -> Result<FixPrompt> {
    let prompt = match &config.llm.templates_dir {
        Some(dir) => FixPrompt::with_loader(&PromptLoader::new(dir)),
        None => FixPrompt::builtin(),
    };
    prompt.context("Failed to build fix prompt")
}

/// Where a stopped session's last source is kept: `<file>.fixloop`.
fn sidecar_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_os_string();
    name.push(".fixloop");
    PathBuf::from(name)
}

/// Persist the final source of a session that changed the code. A success
/// goes back into `file` only with `--in-place`; any other outcome keeps its
/// last source in the sidecar. Returns the path written, if any.
fn save_outcome(file: &Path, outcome: &SessionOutcome, in_place: bool) -> Result<Option<PathBuf>> {
    if !outcome.changed() {
        return Ok(None);
    }
    let target = match (outcome.is_success(), in_place) {
        (true, true) => file.to_path_buf(),
        (true, false) => return Ok(None),
        (false, _) => sidecar_path(file),
    };
    fs::write(&target, &outcome.final_source).context(format!("Failed to write {}", target.display()))?;
    info!("Saved final source of session {} to {}", outcome.session_id, target.display());
    Ok(Some(target))
}

/// Workspaces still on disk belong to runs that never cleaned up.
fn warn_stale_workspaces(workspace: &WorkspaceManager) {
    match workspace.list() {
        Ok(stale) if !stale.is_empty() => {
            log::warn!("Found {} stale session workspace(s): {:?}", stale.len(), stale);
            eprintln!(
                "{} {} stale session workspace(s) under {}",
                "Warning:".yellow(),
                stale.len(),
                workspace.base_path().display()
            );
        }
        Ok(_) => {}
        Err(e) => log::warn!("Failed to list session workspaces: {}", e),
    }
}

fn print_exit_status(result: &ExecutionResult) {
    if result.is_setup_failure() {
        println!("{} {}", "Could not run the script:".red(), result.stderr.trim_end());
    } else if !result.succeeded() {
        println!("{} {}", "Exit status:".red(), result.exit_status);
    }
}

fn exit_code(ok: bool) -> ExitCode {
    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

async fn run_application(cli: &Cli, config: &Config) -> Result<ExitCode> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Fix {
            file,
            language,
            max_attempts,
            interactive,
            in_place,
            no_cache,
        } => {
            let options = FixOptions {
                language: language.as_deref(),
                max_attempts: *max_attempts,
                interactive: *interactive,
                in_place: *in_place,
                no_cache: *no_cache,
            };
            handle_fix_command(file, options, config).await
        }
        Commands::Exec { file, language } => handle_exec_command(file, language.as_deref(), config).await,
        Commands::Diagnose { file, language, json } => {
            handle_diagnose_command(file, language.as_deref(), *json, config).await
        }
        Commands::Cache { command } => handle_cache_command(*command, config),
        Commands::Languages => handle_languages_command(config),
    }
}

struct FixOptions<'a> {
    language: Option<&'a str>,
    max_attempts: Option<u32>,
    interactive: bool,
    in_place: bool,
    no_cache: bool,
}

async fn handle_fix_command(file: &Path, options: FixOptions<'_>, config: &Config) -> Result<ExitCode> {
    let source = fs::read_to_string(file).context(format!("Failed to read {}", file.display()))?;
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| eyre::eyre!("Invalid file name: {}", file.display()))?;

    let registry = build_registry(config)?;
    let language = resolve_language(&registry, file, options.language)?;

    let max_attempts = options.max_attempts.unwrap_or(config.session.max_attempts);
    if max_attempts == 0 {
        bail!("--max-attempts must be a positive integer");
    }
    let approval = if options.interactive {
        ApprovalMode::Interactive
    } else {
        config.session.approval
    };

    let llm = Arc::new(ProviderClient::from_config_lenient(&config.llm));
    if !llm.is_ready() {
        eprintln!(
            "{} no model available ({}); failures cannot be fixed",
            "Warning:".yellow(),
            llm.model()
        );
    }
    let workspace = WorkspaceManager::new(&config.session.workspace_dir);
    warn_stale_workspaces(&workspace);
    let proposer = FixProposer::new(
        llm,
        build_cache(config, options.no_cache),
        registry.clone(),
        build_prompt(config)?,
    );
    let runner = SessionRunner::with_config(
        Arc::new(ContainerRunner::new(config.sandbox.clone(), registry.clone()).with_scope("fix")),
        Classifier::new(registry),
        proposer,
        approver_for(approval),
        workspace,
        SessionRunnerConfig {
            max_attempts,
            journal_dir: config.session.journal_dir.clone(),
        },
    );

    println!(
        "{} {} ({}, up to {} attempts)",
        "Fixing".cyan(),
        file.display(),
        language,
        max_attempts
    );
    let outcome = runner.run(file_name, &source, language).await.context("Session failed")?;
    report_outcome(&outcome);

    match save_outcome(file, &outcome, options.in_place)? {
        Some(path) if outcome.is_success() => println!("{} {}", "Wrote fixed source to".green(), path.display()),
        Some(path) => println!("{} {}", "Last attempted source saved to".yellow(), path.display()),
        None if outcome.is_success() && outcome.changed() => {
            println!("\n{}\n{}", "Fixed source:".bold(), outcome.final_source)
        }
        None => {}
    }

    Ok(exit_code(outcome.is_success()))
}

fn report_outcome(outcome: &SessionOutcome) {
    if let Some(result) = &outcome.last_result
        && !result.stdout.is_empty()
    {
        println!("\n{}\n{}", "Output:".bold(), result.stdout.trim_end());
    }
    if outcome.is_success() {
        println!("\n{}", outcome.summary().green());
        return;
    }
    println!("\n{}", outcome.summary().red());
    if let Some(error) = &outcome.last_error {
        println!("{} {}", "Last error:".yellow(), error.summary());
    } else if let Some(result) = &outcome.last_result
        && !result.stderr.trim().is_empty()
    {
        println!("{}\n{}", "Last stderr:".yellow(), result.stderr.trim_end());
    }
}

async fn handle_exec_command(file: &Path, language: Option<&str>, config: &Config) -> Result<ExitCode> {
    let registry = build_registry(config)?;
    let language = resolve_language(&registry, file, language)?;
    let runner = ContainerRunner::new(config.sandbox.clone(), registry);

    let result = runner.execute(file, language.tag()).await;
    print!("{}", result.stdout);
    if !result.is_setup_failure() {
        eprint!("{}", result.stderr);
    }
    print_exit_status(&result);
    Ok(exit_code(result.succeeded()))
}

async fn handle_diagnose_command(file: &Path, language: Option<&str>, json: bool, config: &Config) -> Result<ExitCode> {
    let registry = build_registry(config)?;
    let language = resolve_language(&registry, file, language)?;
    let runner = ContainerRunner::new(config.sandbox.clone(), registry.clone());

    let result = runner.execute(file, language.tag()).await;
    if result.succeeded() {
        println!("{}", "Script ran successfully; nothing to diagnose.".green());
        return Ok(ExitCode::SUCCESS);
    }

    if result.is_setup_failure() {
        print_exit_status(&result);
        return Ok(ExitCode::FAILURE);
    }

    let Some(record) = Classifier::new(registry).classify(&result.stderr, language.tag()) else {
        println!("{}", "Could not diagnose the failure.".red());
        eprint!("{}", result.stderr);
        return Ok(ExitCode::FAILURE);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&record).context("Failed to serialize error record")?);
    } else {
        println!("{} {}", "Type:".bold(), record.error_type);
        println!("{} {}", "Message:".bold(), record.error_message);
        println!("{} {}", "Location:".bold(), record.location());
    }
    Ok(ExitCode::FAILURE)
}

fn handle_cache_command(command: CacheCommands, config: &Config) -> Result<ExitCode> {
    let cache = SqliteFixCache::open_at(&config.cache.path)
        .context(format!("Failed to open fix cache at {}", config.cache.path.display()))?;
    match command {
        CacheCommands::Stats => {
            let stats = cache.stats().context("Failed to read cache stats")?;
            println!("{} {}", "Cache:".bold(), config.cache.path.display());
            println!("  entries: {}", stats.entries);
            println!("  hits:    {}", stats.hits);
        }
        CacheCommands::Clear => {
            let removed = cache.clear().context("Failed to clear cache")?;
            println!("{} {} cached fix(es)", "Removed".green(), removed);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_languages_command(config: &Config) -> Result<ExitCode> {
    let registry = build_registry(config)?;
    for profile in registry.profiles() {
        println!(
            "{:<12} .{:<4} {:<20} {}",
            profile.language.tag().bold(),
            profile.extension,
            profile.image,
            profile.command
        );
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("Starting with config from: {:?}", cli.config);

    run_application(&cli, &config).await.context("Application failed")
}
