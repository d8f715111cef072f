//! Template pack loading, project generation and pack maintenance
//!
//! This module provides:
//! - The pack manifest type (`template.yaml`)
//! - Pack loading from the embedded copy, a local directory or a URL
//! - Project generation (render + copy)
//! - Version compatibility checking

pub mod fetcher;
pub mod generator;
pub mod manifest;
pub mod version;

use crate::product::ProductConfig;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};

pub use fetcher::{build_pack_zip, PackSource, TemplatePack, PACK_NAME};
pub use generator::generate;
pub use manifest::{PackEntry, PackManifest};
pub use version::check_compatibility;

/// Location of the pack sources inside this repository
pub const DEFAULT_PACK_DIR: &str = "crates/plump-core/templates/plump";

/// Build the distributable zip for a pack directory.
///
/// The zip is written next to the pack directory, so that directory's parent
/// can be served as the template URL.
pub async fn build_zips<C: ProductConfig>(
    config: &C,
    template_dir: &Option<PathBuf>,
) -> Result<PathBuf> {
    let dir = template_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PACK_DIR));

    if !dir.exists() {
        anyhow::bail!("Template directory not found: {}", dir.display());
    }

    println!(
        "{}",
        format!("Building {} template pack...", config.display_name())
            .cyan()
            .bold()
    );

    let zip_bytes = build_pack_zip(&dir)?;
    let zip_path = dir
        .parent()
        .unwrap_or(Path::new("."))
        .join(format!("{}.zip", PACK_NAME));
    tokio::fs::write(&zip_path, &zip_bytes)
        .await
        .with_context(|| format!("Failed to write {}", zip_path.display()))?;

    println!(
        "  {} {} ({} bytes)",
        "->".blue(),
        zip_path.display(),
        zip_bytes.len()
    );
    println!("{}", "Built template pack".green().bold());

    Ok(zip_path)
}
