//! Project build settings (`plump-config.json`)
//!
//! Paths and globs are relative to the project root. Every field has a
//! default matching the file the generator writes, so a partial (or missing)
//! settings file still describes a working project.

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the settings file inside a project
pub const SETTINGS_FILE: &str = "plump-config.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid glob '{pattern}' for task '{task}': {source}")]
    InvalidGlob {
        task: String,
        pattern: String,
        source: globset::Error,
    },

    #[error("copy glob '{copy}' overlaps '{task}' glob '{pattern}'")]
    Overlap {
        copy: String,
        task: String,
        pattern: String,
    },
}

/// Input globs per pipeline task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskGlobs {
    pub scripts: Vec<String>,
    pub styles: Vec<String>,
    pub templates: Vec<String>,
    pub images: Vec<String>,
    pub fonts: Vec<String>,
    pub copy: Vec<String>,
}

impl Default for TaskGlobs {
    fn default() -> Self {
        Self {
            scripts: vec!["src/scripts/*.js".to_string()],
            styles: vec!["src/styles/style.scss".to_string()],
            templates: vec!["src/*.html".to_string()],
            images: vec!["src/images/**/*".to_string()],
            fonts: vec!["src/fonts/**/*".to_string()],
            copy: Vec::new(),
        }
    }
}

impl TaskGlobs {
    /// The named asset tasks, i.e. everything except `copy`
    pub fn asset_tasks(&self) -> [(&'static str, &[String]); 5] {
        [
            ("scripts", self.scripts.as_slice()),
            ("styles", self.styles.as_slice()),
            ("templates", self.templates.as_slice()),
            ("images", self.images.as_slice()),
            ("fonts", self.fonts.as_slice()),
        ]
    }
}

/// Globs that re-trigger a task when watching.
///
/// Broader than the input globs: a change to a Sass partial must rebuild the
/// entry point that imports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchGlobs {
    pub styles: Vec<String>,
    pub scripts: Vec<String>,
    pub templates: Vec<String>,
}

impl Default for WatchGlobs {
    fn default() -> Self {
        Self {
            styles: vec!["src/styles/**/*.scss".to_string()],
            scripts: vec!["src/scripts/**/*.js".to_string()],
            templates: vec!["src/**/*.html".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ports {
    pub dev: u16,
    pub dist: u16,
    pub livereload: u16,
}

impl Default for Ports {
    fn default() -> Self {
        Self {
            dev: 9000,
            dist: 9001,
            livereload: 35729,
        }
    }
}

/// FTP credentials for the `stage` task
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Staging {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub remote_path: String,
}

impl Default for Staging {
    fn default() -> Self {
        Self {
            enabled: false,
            host: String::new(),
            port: 21,
            user: String::new(),
            password: String::new(),
            remote_path: "/".to_string(),
        }
    }
}

impl Staging {
    pub fn is_configured(&self) -> bool {
        self.enabled && !self.host.trim().is_empty()
    }
}

// Keep the password out of logs and panics.
impl std::fmt::Debug for Staging {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Staging")
            .field("enabled", &self.enabled)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"********")
            .field("remote_path", &self.remote_path)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub src: PathBuf,
    pub dev: PathBuf,
    pub dist: PathBuf,
    pub tasks: TaskGlobs,
    pub watch: WatchGlobs,
    /// Output paths of copied files are relative to this directory
    pub copy_base: PathBuf,
    pub sass_load_paths: Vec<PathBuf>,
    pub minify_images: bool,
    /// Interface the servers listen on; all interfaces by default
    pub host: IpAddr,
    pub ports: Ports,
    pub staging: Staging,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            src: PathBuf::from("src"),
            dev: PathBuf::from("dev"),
            dist: PathBuf::from("dist"),
            tasks: TaskGlobs::default(),
            watch: WatchGlobs::default(),
            copy_base: PathBuf::from("src"),
            sass_load_paths: vec![PathBuf::from("bower_components")],
            minify_images: true,
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            ports: Ports::default(),
            staging: Staging::default(),
        }
    }
}

impl Settings {
    /// Read `plump-config.json` from a project root; defaults when absent
    pub fn load(project_dir: &Path) -> Result<Self, SettingsError> {
        let path = project_dir.join(SETTINGS_FILE);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| SettingsError::Read {
            path: path.clone(),
            source,
        })?;
        Self::from_json(&content).map_err(|source| SettingsError::Parse { path, source })
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Every glob compiles and no copy glob overlaps an asset task's glob
    pub fn validate(&self) -> Result<(), SettingsError> {
        let mut named: Vec<(&str, &[String])> = self.tasks.asset_tasks().to_vec();
        named.push(("copy", self.tasks.copy.as_slice()));
        named.push(("watch.styles", self.watch.styles.as_slice()));
        named.push(("watch.scripts", self.watch.scripts.as_slice()));
        named.push(("watch.templates", self.watch.templates.as_slice()));
        for (task, patterns) in &named {
            compile_globs(task, patterns)?;
        }

        for copy in &self.tasks.copy {
            for (task, patterns) in self.tasks.asset_tasks() {
                for pattern in patterns {
                    if globs_may_overlap(task, copy, pattern)? {
                        return Err(SettingsError::Overlap {
                            copy: copy.clone(),
                            task: task.to_string(),
                            pattern: pattern.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Files (project-relative, `/`-separated) claimed by both `copy` and an asset task
    pub fn overlaps_in<'a>(
        &self,
        files: &'a [String],
    ) -> Result<Vec<(&'a str, &'static str)>, SettingsError> {
        let copy = compile_globs("copy", &self.tasks.copy)?;
        let mut overlaps = Vec::new();
        for (task, patterns) in self.tasks.asset_tasks() {
            let matcher = compile_globs(task, patterns)?;
            for file in files {
                if copy.is_match(file) && matcher.is_match(file) {
                    overlaps.push((file.as_str(), task));
                }
            }
        }
        Ok(overlaps)
    }
}

fn is_literal(pattern: &str) -> bool {
    !pattern.contains(['*', '?', '[', '{'])
}

/// Whether a copy glob and an asset glob can match a common path.
///
/// Conservative: globs are only called disjoint when their literal bases
/// diverge, their segment counts cannot agree, or both end in different
/// literal extensions.
fn globs_may_overlap(task: &str, copy: &str, pattern: &str) -> Result<bool, SettingsError> {
    if is_literal(copy) {
        return Ok(compile_glob(task, pattern)?.is_match(copy));
    }
    if is_literal(pattern) {
        return Ok(compile_glob("copy", copy)?.is_match(pattern));
    }
    if !bases_nested(glob_base(copy), glob_base(pattern)) {
        return Ok(false);
    }

    let (copy_min, copy_max) = depth_range(copy);
    let (task_min, task_max) = depth_range(pattern);
    if copy_max.is_some_and(|max| max < task_min) || task_max.is_some_and(|max| max < copy_min) {
        return Ok(false);
    }

    Ok(match (literal_extension(copy), literal_extension(pattern)) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    })
}

/// One base is a component-wise prefix of the other
fn bases_nested(a: &str, b: &str) -> bool {
    let a: Vec<&str> = a.split('/').filter(|s| !s.is_empty()).collect();
    let b: Vec<&str> = b.split('/').filter(|s| !s.is_empty()).collect();
    let shared = a.len().min(b.len());
    a[..shared] == b[..shared]
}

/// Fewest and most path segments a glob can match; `**` lifts the maximum
fn depth_range(pattern: &str) -> (usize, Option<usize>) {
    let segments: Vec<&str> = pattern.split('/').collect();
    let fixed = segments.iter().filter(|s| !s.contains("**")).count();
    if segments.iter().any(|s| s.contains("**")) {
        (fixed, None)
    } else {
        (fixed, Some(fixed))
    }
}

/// `png` for `src/**/*.png`; `None` when the last segment's extension is not literal
fn literal_extension(pattern: &str) -> Option<&str> {
    let last = pattern.rsplit('/').next()?;
    if last.contains("**") {
        return None;
    }
    let (_, ext) = last.rsplit_once('.')?;
    (!ext.is_empty() && is_literal(ext)).then_some(ext)
}

fn compile_glob(task: &str, pattern: &str) -> Result<globset::GlobMatcher, SettingsError> {
    Ok(build_glob(task, pattern)?.compile_matcher())
}

fn build_glob(task: &str, pattern: &str) -> Result<Glob, SettingsError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|source| SettingsError::InvalidGlob {
            task: task.to_string(),
            pattern: pattern.to_string(),
            source,
        })
}

/// Compile a task's patterns into one matcher; `*` does not cross `/`
pub fn compile_globs(task: &str, patterns: &[String]) -> Result<GlobSet, SettingsError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(build_glob(task, pattern)?);
    }
    builder.build().map_err(|source| SettingsError::InvalidGlob {
        task: task.to_string(),
        pattern: patterns.join(", "),
        source,
    })
}

/// The literal directory prefix of a glob (`src/images/**/*` -> `src/images`)
pub fn glob_base(pattern: &str) -> &str {
    let mut end = 0;
    for (idx, part) in pattern.split('/').enumerate() {
        if part.contains(['*', '?', '[', '{']) {
            break;
        }
        end = if idx == 0 { part.len() } else { end + 1 + part.len() };
    }
    // A pattern without metacharacters names a file; its base is the parent.
    if end == pattern.len() {
        return pattern.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    }
    &pattern[..end]
}
