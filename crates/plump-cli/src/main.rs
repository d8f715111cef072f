//! Plump CLI - Front-end project scaffolding and build tasks

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use plump_core::tui::CreateArgs;
use plump_core::{ProductConfig, RunOptions, TaskName};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// CLI version
pub const CLI_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Plump product configuration
#[derive(Clone)]
pub struct PlumpConfig;

impl ProductConfig for PlumpConfig {
    fn name(&self) -> &'static str {
        "plump"
    }

    fn display_name(&self) -> &'static str {
        "Plump"
    }

    fn template_url_env(&self) -> &'static str {
        "PLUMP_TEMPLATE_URL"
    }

    fn docs_url(&self) -> &'static str {
        "https://github.com/plump-dev/plump#readme"
    }

    fn cli_description(&self) -> &'static str {
        "Scaffold front-end projects and run their build tasks"
    }

    fn upgrade_command(&self) -> &'static str {
        "cargo install plump-cli --force"
    }

    fn next_steps(&self, dir: &Path, dependencies_installed: bool) -> Vec<String> {
        let mut steps = Vec::new();
        let current = std::env::current_dir().ok();

        // Step 1: cd to directory if not current
        if current.as_deref() != Some(dir) {
            steps.push(format!("cd {}", dir.display()));
        }

        // Step 2: Install dependencies
        if !dependencies_installed {
            steps.push("npm install && bower install".to_string());
        }

        // Step 3: Start the dev server
        steps.push("plump run develop --open".to_string());

        steps
    }
}

#[derive(Parser, Debug)]
#[command(name = "plump")]
#[command(about = "Scaffold front-end projects and run their build tasks")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new Plump project
    Create(CliCreateArgs),
    /// Run a build task in a Plump project
    Run(RunArgs),
    /// Build the template pack zip from a template directory (for development use)
    BuildZips(BuildZipsArgs),
}

#[derive(Parser, Debug, Default)]
pub struct CliCreateArgs {
    /// Local directory to use for templates instead of the built-in pack (for development use)
    #[arg(long = "template-dir")]
    pub template_dir: Option<PathBuf>,

    /// Project directory to create
    #[arg(short, long)]
    pub directory: Option<PathBuf>,

    /// Project name (defaults to the directory name)
    #[arg(short, long)]
    pub name: Option<String>,

    /// inuitcss modules to include (comma-separated, e.g. defaults,box-sizing)
    #[arg(long, value_delimiter = ',')]
    pub inuit: Option<Vec<String>>,

    /// plumpcss modules to include (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub plump: Option<Vec<String>>,

    /// Module catalog YAML file replacing the built-in one
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Optimize PNG images during the build
    #[arg(long = "minify-images", action = ArgAction::SetTrue, overrides_with = "no_minify_images")]
    pub minify_images: bool,

    /// Copy images without optimizing them
    #[arg(long = "no-minify-images", action = ArgAction::SetTrue)]
    pub no_minify_images: bool,

    /// Enable FTP staging deployment in the generated settings
    #[arg(long)]
    pub staging: bool,

    /// Run npm and bower installs after generating
    #[arg(long)]
    pub install: bool,

    /// Auto-confirm all prompts (non-interactive mode)
    #[arg(short, long)]
    pub yes: bool,
}

impl From<CliCreateArgs> for CreateArgs {
    fn from(args: CliCreateArgs) -> Self {
        let mut modules = BTreeMap::new();
        if let Some(inuit) = args.inuit {
            modules.insert("inuit".to_string(), inuit);
        }
        if let Some(plump) = args.plump {
            modules.insert("plump".to_string(), plump);
        }

        let minify_images = match (args.minify_images, args.no_minify_images) {
            (_, true) => Some(false),
            (true, false) => Some(true),
            (false, false) => None,
        };

        CreateArgs {
            template_dir: args.template_dir,
            directory: args.directory,
            name: args.name,
            modules,
            catalog: args.catalog,
            minify_images,
            staging: args.staging.then_some(true),
            install: args.install,
            yes: args.yes,
        }
    }
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Task to run
    #[arg(value_enum, default_value_t = TaskName::Default)]
    pub task: TaskName,

    /// Open the served site in the default browser (serve, develop)
    #[arg(long)]
    pub open: bool,

    /// Project directory (defaults to the current directory)
    #[arg(short = 'C', long = "dir", default_value = ".")]
    pub dir: PathBuf,
}

#[derive(Parser, Debug)]
pub struct BuildZipsArgs {
    /// Local directory containing the template pack (for development use)
    #[arg(long = "template-dir")]
    pub template_dir: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Run the interactive generator, restoring the cursor however it ends
async fn create(config: &PlumpConfig, args: CreateArgs) -> Result<()> {
    // Ensure terminal cursor is restored on panic
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = console::Term::stderr().show_cursor();
        default_panic(info);
    }));

    // Handle Ctrl+C gracefully
    ctrlc::set_handler(move || {
        let _ = console::Term::stderr().show_cursor();
        std::process::exit(130);
    })
    .ok();

    let result = plump_core::run(config, args, CLI_VERSION).await;

    // Ensure cursor is visible on normal exit
    let _ = console::Term::stderr().show_cursor();

    result
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    let config = PlumpConfig;

    // Handle subcommands
    match args.command {
        Some(Command::Create(create_args)) => create(&config, create_args.into()).await,
        Some(Command::Run(run_args)) => {
            // Tasks install their own Ctrl+C handling for long-running servers
            let options = RunOptions {
                project_dir: run_args.dir,
                open: run_args.open,
            };
            plump_core::run_task(run_args.task, &options).await
        }
        Some(Command::BuildZips(build_args)) => {
            plump_core::templates::build_zips(&config, &build_args.template_dir)
                .await
                .map(|_| ())
        }
        // No subcommand provided, default to create behavior (interactive mode)
        None => create(&config, CreateArgs::default()).await,
    }
}
