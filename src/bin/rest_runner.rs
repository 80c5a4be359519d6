//! Command-line runner for `.http` files.
//!
//! Runs every request in FILE in order and exits with the batch exit code:
//! 0 clean, 1 cancelled, 2 response handler failed, 3 a request failed.

use clap::Parser;
use rest_runner::config::{get_config, load_config_file, RunnerConfig};
use rest_runner::environment::{available_environments, Environment, FileEnvironmentIndex};
use rest_runner::runner::{ConsoleSink, ExecutionBatch, ExitCode, RequestBatchRunner};
use rest_runner::template::parse_file;
use rest_runner::variables::{GlobalContext, VariableSubstitutor};
use rest_runner::ProjectContext;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "rest-runner", version, about = "Run the requests of an .http file in order")]
struct Cli {
    /// The .http file to run
    file: PathBuf,

    /// Environment to resolve variables from; repeat to layer several
    #[arg(short, long = "env", value_name = "NAME")]
    environments: Vec<String>,

    /// Project root (defaults to the file's directory)
    #[arg(long, value_name = "DIR")]
    project_root: Option<PathBuf>,

    /// Scratch area; files in it skip pre-request scripts
    #[arg(long, value_name = "DIR")]
    scratch_dir: Option<PathBuf>,

    /// JSON file holding global variables, loaded before and saved after the run
    #[arg(long, value_name = "FILE")]
    global_store: Option<PathBuf>,

    /// Settings file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the environments available to FILE and exit
    #[arg(long)]
    list_environments: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config_file(path),
        None => Ok(get_config()),
    };

    let log_level = config
        .as_ref()
        .map(|config| config.log_level.clone())
        .unwrap_or_else(|_| RunnerConfig::default().log_level);
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let code = match config {
        Ok(config) => match run(cli, config).await {
            Ok(code) => code,
            Err(err) => {
                eprintln!("error: {}", err);
                ExitCode::ExecutionFailed.code()
            }
        },
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::ExecutionFailed.code()
        }
    };

    std::process::exit(code);
}

async fn run(cli: Cli, config: RunnerConfig) -> Result<i32, Box<dyn Error>> {
    let file = fs::canonicalize(&cli.file)?;
    let project = project_for(&cli, &config, &file)?;
    log::debug!("Project root {}", project.root().display());

    let mut index = FileEnvironmentIndex::scan(&project, config.environment_files.clone());
    if !project.contains(&file) && !project.is_scratch(&file) {
        if let Some(dir) = file.parent() {
            index.scan_directory(dir);
        }
    }

    if cli.list_environments {
        for name in available_environments(&index, &project, Some(&file))? {
            println!("{}", name);
        }
        return Ok(ExitCode::Success.code());
    }

    let content = fs::read_to_string(&file)?;
    let templates = parse_file(&content, Some(&file))?;

    let global = match &cli.global_store {
        Some(path) => GlobalContext::load(path)?,
        None => GlobalContext::new(),
    };
    let environment = Environment::for_file(Arc::new(index), &project, Some(&file), cli.environments);
    let substitutor = VariableSubstitutor::new(environment, global).with_project(project.clone());

    let runner = RequestBatchRunner::from_config(&config)?.with_project(project);
    let cancel = runner.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::debug!("Interrupted");
            cancel.cancel();
        }
    });

    let sink = ConsoleSink::stdout();
    let report = runner
        .run(ExecutionBatch::new(templates, &substitutor), &sink)
        .await?;

    if cli.global_store.is_some() {
        if let Err(err) = substitutor.global().save() {
            log::warn!("Failed to save global variables: {}", err);
        }
    }

    Ok(report.exit_code.code())
}

fn project_for(cli: &Cli, config: &RunnerConfig, file: &Path) -> Result<ProjectContext, Box<dyn Error>> {
    let root = match &cli.project_root {
        Some(root) => fs::canonicalize(root)?,
        None => file
            .parent()
            .map(Path::to_path_buf)
            .ok_or("request file has no parent directory")?,
    };

    let scratch = cli
        .scratch_dir
        .clone()
        .or_else(|| config.scratch_directory.clone())
        .map(|dir| if dir.is_relative() { root.join(dir) } else { dir });

    let project = ProjectContext::new(root);
    Ok(match scratch {
        Some(scratch) => project.with_scratch_root(fs::canonicalize(&scratch).unwrap_or(scratch)),
        None => project,
    })
}
