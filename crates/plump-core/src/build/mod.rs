//! The project task runner
//!
//! Tasks are a fixed set: pipeline tasks read matching files under `src/`,
//! push them through a fixed sequence of transformations and write to `dev/`
//! and `dist/`. `build` runs every pipeline task concurrently; `develop`
//! layers a watcher, a live-reload channel and a dev server on top.

pub mod images;
pub mod pipeline;
pub mod report;
pub mod serve;
pub mod settings;
pub mod stage;
pub mod task;
pub mod watch;

use anyhow::{Context, Result};
use colored::Colorize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

pub use settings::{Settings, SettingsError, SETTINGS_FILE};
pub use task::{TaskName, BUILD_TASKS};

/// Options for a `plump run` invocation
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Project root containing `plump-config.json`
    pub project_dir: PathBuf,

    /// Open the served URL in the default browser
    pub open: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("."),
            open: false,
        }
    }
}

/// A project root plus its validated settings
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub root: PathBuf,
    pub settings: Settings,
    pub open: bool,
}

impl TaskContext {
    pub fn new(root: impl Into<PathBuf>, settings: Settings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            root: root.into(),
            settings,
            open: false,
        })
    }

    pub fn load(options: &RunOptions) -> Result<Self> {
        let settings = Settings::load(&options.project_dir)?;
        let mut ctx = Self::new(options.project_dir.clone(), settings)?;
        ctx.open = options.open;
        Ok(ctx)
    }

    /// Resolve a project-relative path
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    pub fn src_dir(&self) -> PathBuf {
        self.path(&self.settings.src)
    }

    pub fn dev_dir(&self) -> PathBuf {
        self.path(&self.settings.dev)
    }

    pub fn dist_dir(&self) -> PathBuf {
        self.path(&self.settings.dist)
    }

    /// Server address for `port` on the configured interface
    pub fn bind_addr(&self, port: u16) -> SocketAddr {
        SocketAddr::new(self.settings.host, port)
    }

    /// Both output roots, development first
    pub fn output_dirs(&self) -> [PathBuf; 2] {
        [self.dev_dir(), self.dist_dir()]
    }
}

/// Run a task by name against the project in `options.project_dir`
pub async fn run_task(task: TaskName, options: &RunOptions) -> Result<()> {
    if task == TaskName::Default {
        print_task_list();
        return Ok(());
    }

    let ctx = Arc::new(TaskContext::load(options)?);

    match task {
        TaskName::Build => build(ctx).await.map(|_| ()),
        TaskName::Watch => {
            let _watch = watch::spawn_source_watch(ctx.clone())?;
            report::info(format!(
                "Watching {} for changes (Ctrl+C to stop)",
                ctx.src_dir().display()
            ));
            wait_for_shutdown().await
        }
        TaskName::Serve => serve_dist(ctx).await,
        TaskName::Develop => develop(ctx).await,
        TaskName::Stage => {
            let started = Instant::now();
            report::starting(task);
            let uploaded = stage::deploy(ctx).await?;
            report::finished(task, started.elapsed(), uploaded);
            Ok(())
        }
        TaskName::Default => Ok(()),
        leaf => run_leaf(leaf, ctx).await.map(|_| ()),
    }
}

/// Run one pipeline (or `clean`) task on the blocking pool, with progress output.
/// Returns the number of files the task handled.
pub async fn run_leaf(task: TaskName, ctx: Arc<TaskContext>) -> Result<usize> {
    let started = Instant::now();
    report::starting(task);

    let result = tokio::task::spawn_blocking(move || pipeline::run(task, &ctx))
        .await
        .with_context(|| format!("Task '{}' panicked", task))?;

    match result {
        Ok(files) => {
            report::finished(task, started.elapsed(), files);
            Ok(files)
        }
        Err(e) => {
            report::failed(task, &e);
            Err(e)
        }
    }
}

/// Run every task in [`BUILD_TASKS`] concurrently and wait for all of them.
/// Returns the total number of input files.
pub async fn build(ctx: Arc<TaskContext>) -> Result<usize> {
    let started = Instant::now();
    report::starting(TaskName::Build);

    let mut set = JoinSet::new();
    for task in BUILD_TASKS {
        set.spawn(run_leaf(task, ctx.clone()));
    }

    let mut failed = 0;
    let mut files = 0;
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok(count)) => files += count,
            // Already reported by run_leaf
            Ok(Err(_)) => failed += 1,
            Err(e) => {
                report::warn(format!("build task aborted: {}", e));
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} build tasks failed", failed, BUILD_TASKS.len());
    }

    report::finished(TaskName::Build, started.elapsed(), files);
    Ok(files)
}

async fn serve_dist(ctx: Arc<TaskContext>) -> Result<()> {
    let addr = ctx.bind_addr(ctx.settings.ports.dist);
    let bound = serve::start_server(serve::static_router(ctx.dist_dir()), addr).await?;
    announce_server("dist", bound, ctx.open);
    wait_for_shutdown().await
}

async fn develop(ctx: Arc<TaskContext>) -> Result<()> {
    // A broken initial build should not stop the dev loop; the watcher
    // rebuilds once the source is fixed.
    if let Err(e) = build(ctx.clone()).await {
        report::warn(format!("initial build failed: {:#}", e));
    }

    let ports = ctx.settings.ports;
    let livereload = serve::LiveReload::new();
    let lr_addr = serve::start_server(
        livereload.router(),
        ctx.bind_addr(ports.livereload),
    )
    .await?;
    tracing::info!(%lr_addr, "live reload listening");

    let _dev_watch = watch::spawn_reload_watch(ctx.dev_dir(), livereload.clone())?;
    let _src_watch = watch::spawn_source_watch(ctx.clone())?;

    let dev_addr = serve::start_server(
        serve::dev_router(ctx.dev_dir(), ports.livereload),
        ctx.bind_addr(ports.dev),
    )
    .await?;
    announce_server("dev", dev_addr, ctx.open);

    wait_for_shutdown().await
}

fn announce_server(label: &str, addr: SocketAddr, open_browser: bool) {
    let url = format!("http://localhost:{}", addr.port());
    report::info(format!("Serving {} at {}", label, url.green()));
    if open_browser {
        if let Err(e) = open::that(&url) {
            report::warn(format!("could not open a browser: {}", e));
        }
    }
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    report::info("Stopping");
    Ok(())
}

/// The `default` task
pub fn print_task_list() {
    println!("{}", "----------".magenta());
    println!("{}", "Plump".magenta().bold());
    println!("The following tasks are available:");
    for task in TaskName::ALL {
        println!("  {} {}", format!("{:<10}", task.as_str()).cyan(), task.description());
    }
    println!("{}", "----------".magenta());
}
