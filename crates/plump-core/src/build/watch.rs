//! File watchers for `watch` and `develop`

use super::serve::LiveReload;
use super::settings::{compile_globs, SettingsError};
use super::task::TaskName;
use super::{report, run_leaf, TaskContext};
use anyhow::{Context, Result};
use globset::GlobSet;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::task::JoinHandle;

/// Quiet period after the first event before a batch is handled
const DEBOUNCE: Duration = Duration::from_millis(150);

/// Keeps a watcher alive; dropping it stops watching
pub struct WatchHandle {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Which tasks a changed source file re-runs
#[derive(Debug, Clone)]
pub struct WatchPlan {
    entries: Vec<(TaskName, GlobSet)>,
}

impl WatchPlan {
    pub fn new(ctx: &TaskContext) -> Result<Self, SettingsError> {
        let settings = &ctx.settings;
        let sources = [
            (TaskName::Styles, &settings.watch.styles),
            (TaskName::Scripts, &settings.watch.scripts),
            (TaskName::Templates, &settings.watch.templates),
            (TaskName::Images, &settings.tasks.images),
            (TaskName::Fonts, &settings.tasks.fonts),
            (TaskName::Copy, &settings.tasks.copy),
        ];

        let mut entries = Vec::new();
        for (task, patterns) in sources {
            if patterns.is_empty() {
                continue;
            }
            entries.push((task, compile_globs(task.as_str(), patterns)?));
        }
        Ok(Self { entries })
    }

    /// Tasks matching any of the project-relative `paths`, in task order
    pub fn tasks_for<S: AsRef<str>>(&self, paths: &[S]) -> BTreeSet<TaskName> {
        let mut tasks = BTreeSet::new();
        for path in paths {
            for (task, globs) in &self.entries {
                if globs.is_match(path.as_ref()) {
                    tasks.insert(*task);
                }
            }
        }
        tasks
    }
}

type EventRx = UnboundedReceiver<notify::Result<Event>>;

fn start_watcher(dir: &Path) -> Result<(RecommendedWatcher, EventRx)> {
    let (tx, rx) = unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
        let _ = tx.send(event);
    })
    .context("Failed to create file watcher")?;
    watcher
        .watch(dir, RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {}", dir.display()))?;
    Ok((watcher, rx))
}

/// Wait for the next batch of changed paths. `None` once the watcher is gone.
async fn next_batch(rx: &mut EventRx) -> Option<BTreeSet<PathBuf>> {
    let mut paths = BTreeSet::new();
    let first = rx.recv().await?;
    collect(first, &mut paths);

    tokio::time::sleep(DEBOUNCE).await;
    while let Ok(event) = rx.try_recv() {
        collect(event, &mut paths);
    }
    Some(paths)
}

fn collect(event: notify::Result<Event>, paths: &mut BTreeSet<PathBuf>) {
    match event {
        Ok(event) if matches!(event.kind, EventKind::Access(_)) => {}
        Ok(event) => paths.extend(event.paths),
        Err(e) => tracing::warn!(error = %e, "file watcher error"),
    }
}

/// Project-relative, `/`-separated form of an event path
fn relative_to(path: &Path, roots: &[PathBuf]) -> Option<String> {
    roots.iter().find_map(|root| {
        path.strip_prefix(root).ok().map(|rel| {
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/")
        })
    })
}

/// Event paths are absolute (and possibly canonical); match against both forms
fn root_forms(root: &Path) -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Ok(canonical) = std::fs::canonicalize(root) {
        roots.push(canonical);
    }
    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd.join(root));
    }
    roots.push(root.to_path_buf());
    roots
}

/// Watch `src/` and re-run the tasks whose globs match what changed.
///
/// Task errors are reported and the watch carries on.
pub fn spawn_source_watch(ctx: Arc<TaskContext>) -> Result<WatchHandle> {
    let plan = WatchPlan::new(&ctx)?;
    let src = ctx.src_dir();
    let (watcher, mut rx) = start_watcher(&src)?;
    let roots = root_forms(&ctx.root);
    tracing::debug!(dir = %src.display(), "watching sources");

    let task = tokio::spawn(async move {
        while let Some(paths) = next_batch(&mut rx).await {
            let relative: Vec<String> = paths
                .iter()
                .filter_map(|p| relative_to(p, &roots))
                .collect();
            for task in plan.tasks_for(relative.as_slice()) {
                // run_leaf already printed the failure
                let _ = run_leaf(task, ctx.clone()).await;
            }
        }
    });

    Ok(WatchHandle {
        _watcher: watcher,
        task,
    })
}

/// Watch the development output and notify live-reload clients
pub fn spawn_reload_watch(dev_dir: PathBuf, livereload: LiveReload) -> Result<WatchHandle> {
    std::fs::create_dir_all(&dev_dir)
        .with_context(|| format!("Failed to create {}", dev_dir.display()))?;
    let (watcher, mut rx) = start_watcher(&dev_dir)?;
    let roots = root_forms(&dev_dir);

    let task = tokio::spawn(async move {
        while let Some(paths) = next_batch(&mut rx).await {
            for path in paths.iter().filter_map(|p| relative_to(p, &roots)) {
                livereload.notify_changed(&path);
            }
        }
        report::warn("live reload watcher stopped");
    });

    Ok(WatchHandle {
        _watcher: watcher,
        task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::Settings;

    fn plan_for(settings: Settings) -> WatchPlan {
        let ctx = TaskContext::new("/project", settings).unwrap();
        WatchPlan::new(&ctx).unwrap()
    }

    #[test]
    fn test_partial_change_rebuilds_styles() {
        let plan = plan_for(Settings::default());
        let tasks = plan.tasks_for(&["src/styles/settings/_colors.scss"]);
        assert_eq!(tasks.into_iter().collect::<Vec<_>>(), vec![TaskName::Styles]);
    }

    #[test]
    fn test_layout_change_rebuilds_templates() {
        let plan = plan_for(Settings::default());
        let tasks = plan.tasks_for(&["src/templates/partials/header.html"]);
        assert!(tasks.contains(&TaskName::Templates));
    }

    #[test]
    fn test_batch_maps_to_each_task_once() {
        let plan = plan_for(Settings::default());
        let tasks = plan.tasks_for(&[
            "src/scripts/a.js",
            "src/scripts/lib/b.js",
            "src/images/logo.png",
            "src/fonts/a.woff",
            "README.md",
        ]);
        assert_eq!(
            tasks.into_iter().collect::<Vec<_>>(),
            vec![TaskName::Scripts, TaskName::Images, TaskName::Fonts]
        );
    }

    #[test]
    fn test_copy_globs_are_watched_when_set() {
        let mut settings = Settings::default();
        assert!(plan_for(settings.clone()).tasks_for(&["src/robots.txt"]).is_empty());

        settings.tasks.copy = vec!["src/robots.txt".to_string()];
        let tasks = plan_for(settings).tasks_for(&["src/robots.txt"]);
        assert_eq!(tasks.into_iter().collect::<Vec<_>>(), vec![TaskName::Copy]);
    }

    #[test]
    fn test_relative_to_first_matching_root() {
        let roots = vec![PathBuf::from("/a/b"), PathBuf::from("/c")];
        assert_eq!(
            relative_to(Path::new("/c/src/x.js"), &roots).as_deref(),
            Some("src/x.js")
        );
        assert_eq!(relative_to(Path::new("/d/x.js"), &roots), None);
    }
}
