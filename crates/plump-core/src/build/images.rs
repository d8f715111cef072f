//! The `images` task: copy images to both outputs, optimizing PNGs
//!
//! A fingerprint cache in the project root skips files whose content (and
//! the minify setting) have not changed since the last run.

use super::pipeline::{matching_files, write_output};
use super::report;
use super::TaskContext;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CACHE_FILE: &str = ".plump-cache.json";

/// oxipng optimization level for lossless PNG compression
const PNG_PRESET: u8 = 3;

/// Fingerprints of the images written by the last run, keyed by project-relative path
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCache {
    #[serde(default)]
    pub images: BTreeMap<String, String>,
}

impl ImageCache {
    /// A missing or unreadable cache is treated as empty
    pub fn load(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&content) {
            Ok(cache) => cache,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "ignoring unreadable image cache");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// Content fingerprint (blake3, hex); the minify flag is part of it so toggling it re-runs
pub fn fingerprint(bytes: &[u8], minify: bool) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(bytes);
    hasher.update(&[u8::from(minify)]);
    hasher.finalize().to_hex().to_string()
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
}

fn optimize(path: &Path, bytes: Vec<u8>, minify: bool) -> Vec<u8> {
    if !minify || !is_png(path) {
        return bytes;
    }
    match oxipng::optimize_from_memory(&bytes, &oxipng::Options::from_preset(PNG_PRESET)) {
        // Never write a larger file than the source
        Ok(optimized) if optimized.len() < bytes.len() => optimized,
        Ok(_) => bytes,
        Err(e) => {
            report::warn(format!("could not optimize {}: {}", path.display(), e));
            bytes
        }
    }
}

pub fn run(ctx: &TaskContext) -> Result<usize> {
    let files = matching_files(ctx, "images", &ctx.settings.tasks.images)?;
    let minify = ctx.settings.minify_images;
    let cache_path = ctx.path(CACHE_FILE);
    let previous = ImageCache::load(&cache_path);
    let mut next = ImageCache::default();
    let outputs: Vec<PathBuf> = ctx.output_dirs().iter().map(|d| d.join("images")).collect();

    let mut skipped = 0;
    for file in &files {
        let bytes = std::fs::read(&file.path)
            .with_context(|| format!("Failed to read {}", file.relative))?;
        let print = fingerprint(&bytes, minify);

        let unchanged = previous.images.get(&file.relative) == Some(&print)
            && outputs.iter().all(|d| d.join(&file.from_base).is_file());
        if unchanged {
            skipped += 1;
        } else {
            let output = optimize(&file.path, bytes, minify);
            for dir in &outputs {
                write_output(dir, &file.from_base, &output)?;
            }
        }
        next.images.insert(file.relative.clone(), print);
    }

    if skipped > 0 {
        tracing::debug!(skipped, "images unchanged since last run");
    }
    if next != previous {
        next.save(&cache_path)?;
    }
    Ok(files.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::Settings;

    // 1x1 RGBA PNG
    const TINY_PNG: &[u8] = &[
        0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48,
        0x44, 0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00,
        0x00, 0x1f, 0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78,
        0x9c, 0x63, 0x00, 0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00,
        0x00, 0x00, 0x00, 0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
    ];

    fn project(minify: bool) -> (tempfile::TempDir, TaskContext) {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("src/images/icons");
        std::fs::create_dir_all(&images).unwrap();
        std::fs::write(images.join("dot.png"), TINY_PNG).unwrap();
        std::fs::write(dir.path().join("src/images/photo.jpg"), [0xff, 0xd8, 0xff]).unwrap();

        let settings = Settings {
            minify_images: minify,
            ..Settings::default()
        };
        let ctx = TaskContext::new(dir.path(), settings).unwrap();
        (dir, ctx)
    }

    #[test]
    fn test_images_copied_to_both_outputs() {
        let (dir, ctx) = project(false);
        assert_eq!(run(&ctx).unwrap(), 2);
        for out in ["dev", "dist"] {
            let png = std::fs::read(dir.path().join(out).join("images/icons/dot.png")).unwrap();
            assert_eq!(png, TINY_PNG);
            assert!(dir.path().join(out).join("images/photo.jpg").is_file());
        }
    }

    #[test]
    fn test_minify_keeps_a_valid_png_no_larger() {
        let (dir, ctx) = project(true);
        run(&ctx).unwrap();
        let png = std::fs::read(dir.path().join("dist/images/icons/dot.png")).unwrap();
        assert!(png.starts_with(&TINY_PNG[..8]));
        assert!(png.len() <= TINY_PNG.len());
        // Non-PNG images are copied untouched
        let jpg = std::fs::read(dir.path().join("dist/images/photo.jpg")).unwrap();
        assert_eq!(jpg, [0xff, 0xd8, 0xff]);
    }

    #[test]
    fn test_cache_records_every_image() {
        let (dir, ctx) = project(false);
        run(&ctx).unwrap();
        let cache = ImageCache::load(&dir.path().join(CACHE_FILE));
        assert_eq!(
            cache.images.keys().collect::<Vec<_>>(),
            vec!["src/images/icons/dot.png", "src/images/photo.jpg"]
        );
    }

    #[test]
    fn test_unchanged_image_is_not_rewritten() {
        let (dir, ctx) = project(false);
        run(&ctx).unwrap();

        // Tamper with the output: a cached run must leave it alone
        let out = dir.path().join("dev/images/photo.jpg");
        std::fs::write(&out, "marker").unwrap();
        run(&ctx).unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "marker");

        // A changed source is picked up
        std::fs::write(dir.path().join("src/images/photo.jpg"), [0xff, 0xd8, 0x00]).unwrap();
        run(&ctx).unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), [0xff, 0xd8, 0x00]);
    }

    #[test]
    fn test_missing_output_is_rewritten_despite_cache() {
        let (dir, ctx) = project(false);
        run(&ctx).unwrap();
        std::fs::remove_dir_all(dir.path().join("dist")).unwrap();
        run(&ctx).unwrap();
        assert!(dir.path().join("dist/images/photo.jpg").is_file());
    }

    #[test]
    fn test_fingerprint_depends_on_minify_flag() {
        assert_ne!(fingerprint(b"abc", true), fingerprint(b"abc", false));
        assert_eq!(fingerprint(b"abc", true), fingerprint(b"abc", true));
    }

    #[test]
    fn test_fingerprint_is_stable_across_builds() {
        // Persisted in the cache file, so it must not depend on the toolchain
        let mut expected = blake3::Hasher::new();
        expected.update(b"abc");
        expected.update(&[0]);
        assert_eq!(fingerprint(b"abc", false), expected.finalize().to_hex().as_str());
        assert_eq!(fingerprint(b"abc", false).len(), 64);
    }

    #[test]
    fn test_corrupt_cache_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE);
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(ImageCache::load(&path), ImageCache::default());
    }
}
