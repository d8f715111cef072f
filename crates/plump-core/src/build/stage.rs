//! The `stage` task: upload `dist/` to an FTP staging host

use super::settings::{Staging, SETTINGS_FILE};
use super::TaskContext;
use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use suppaftp::types::FileType;
use suppaftp::FtpStream;
use walkdir::WalkDir;

/// Remote directories to create and files to upload, parents first
#[derive(Debug, Default, PartialEq, Eq)]
pub struct UploadPlan {
    pub dirs: Vec<String>,
    pub files: Vec<(PathBuf, String)>,
}

/// Join a `/`-separated relative path onto a remote root
pub fn remote_join(root: &str, relative: &str) -> String {
    let root = root.trim_end_matches('/');
    let relative = relative.trim_start_matches('/');
    match (root.is_empty(), relative.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{}", relative),
        (false, true) => root.to_string(),
        (false, false) => format!("{}/{}", root, relative),
    }
}

/// Walk `dist` and map every entry to its remote path under `remote_root`.
///
/// Every planned path is absolute; a relative root is taken from `/`.
pub fn plan_uploads(dist: &Path, remote_root: &str) -> Result<UploadPlan> {
    let mut plan = UploadPlan::default();
    let remote_root = remote_join("/", remote_root);

    // Ancestors of the remote root, so a fresh host works too
    let mut prefix = String::new();
    for segment in remote_root.split('/').filter(|s| !s.is_empty()) {
        prefix = format!("{}/{}", prefix, segment);
        plan.dirs.push(prefix.clone());
    }

    for entry in WalkDir::new(dist).min_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", dist.display()))?;
        let relative = entry
            .path()
            .strip_prefix(dist)?
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let remote = remote_join(&remote_root, &relative);

        if entry.file_type().is_dir() {
            plan.dirs.push(remote);
        } else if entry.file_type().is_file() {
            plan.files.push((entry.path().to_path_buf(), remote));
        }
    }

    Ok(plan)
}

/// Upload the distribution build, returning the number of files sent
pub async fn deploy(ctx: Arc<TaskContext>) -> Result<usize> {
    let staging = ctx.settings.staging.clone();
    if !staging.is_configured() {
        anyhow::bail!(
            "Staging is not configured. Set staging.enabled and staging.host in {}",
            SETTINGS_FILE
        );
    }

    let dist = ctx.dist_dir();
    if !dist.is_dir() {
        anyhow::bail!(
            "{} does not exist. Run `plump run build` first",
            dist.display()
        );
    }

    let plan = plan_uploads(&dist, &staging.remote_path)?;
    tokio::task::spawn_blocking(move || upload(&staging, &plan))
        .await
        .context("Staging upload panicked")?
}

fn upload(staging: &Staging, plan: &UploadPlan) -> Result<usize> {
    tracing::info!(host = %staging.host, port = staging.port, "connecting to staging");
    let mut ftp = FtpStream::connect((staging.host.as_str(), staging.port))
        .with_context(|| format!("Failed to connect to {}:{}", staging.host, staging.port))?;
    ftp.login(&staging.user, &staging.password)
        .with_context(|| format!("Failed to log in to {} as '{}'", staging.host, staging.user))?;
    ftp.transfer_type(FileType::Binary)
        .context("Failed to switch to binary transfers")?;

    for dir in &plan.dirs {
        ensure_dir(&mut ftp, dir)?;
    }

    for (local, remote) in &plan.files {
        let mut file =
            File::open(local).with_context(|| format!("Failed to open {}", local.display()))?;
        ftp.put_file(remote, &mut file)
            .with_context(|| format!("Failed to upload {}", remote))?;
        tracing::debug!(%remote, "uploaded");
    }

    if let Err(e) = ftp.quit() {
        tracing::debug!(error = %e, "ftp quit failed");
    }
    Ok(plan.files.len())
}

/// `MKD`, treating "already exists" (the directory is enterable) as success.
/// Planned paths are absolute, so a successful `CWD` does not affect later commands.
fn ensure_dir(ftp: &mut FtpStream, dir: &str) -> Result<()> {
    if ftp.mkdir(dir).is_ok() {
        return Ok(());
    }
    ftp.cwd(dir)
        .with_context(|| format!("Failed to create remote directory {}", dir))
}
