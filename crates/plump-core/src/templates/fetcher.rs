//! Template pack loading from the embedded copy, a local directory or a URL
//!
//! Every source ends up as the same in-memory file map, so generation behaves
//! identically no matter where the pack came from:
//! - Embedded: compiled into the binary
//! - Local: read from a pack directory (for pack development)
//! - Remote: a pre-built `<name>.zip` fetched from a base URL

use super::manifest::PackManifest;
use crate::catalog::Catalog;
use crate::product::ProductConfig;
use anyhow::{Context, Result};
use include_dir::{include_dir, Dir};
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use url::Url;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

static EMBEDDED_PACK: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/templates/plump");

/// Name of the pack every source serves
pub const PACK_NAME: &str = "plump";

const MANIFEST_FILE: &str = "template.yaml";
const CATALOG_FILE: &str = "catalog.yaml";

/// Where the template pack comes from
#[derive(Debug, Clone)]
pub enum PackSource {
    Embedded,
    Local(PathBuf),
    Remote(Url),
}

impl PackSource {
    /// Pick the source: an explicit directory wins, then the product's URL
    /// environment variable, then the embedded pack.
    pub fn resolve<C: ProductConfig>(config: &C, template_dir: Option<&Path>) -> Result<Self> {
        if let Some(dir) = template_dir {
            return Ok(Self::Local(dir.to_path_buf()));
        }
        match std::env::var(config.template_url_env()) {
            Ok(url_str) if !url_str.trim().is_empty() => {
                let url = Url::parse(&url_str)
                    .with_context(|| format!("Invalid template URL: {}", url_str))?;
                Ok(Self::Remote(url))
            }
            _ => Ok(Self::Embedded),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            PackSource::Embedded => "built-in templates".to_string(),
            PackSource::Local(path) => format!("local templates from {}", path.display()),
            PackSource::Remote(url) => format!("remote templates from {}", url),
        }
    }
}

/// A loaded template pack
#[derive(Debug, Clone)]
pub struct TemplatePack {
    pub manifest: PackManifest,
    pub catalog: Catalog,
    files: BTreeMap<String, Vec<u8>>,
}

impl TemplatePack {
    pub async fn load(source: &PackSource, user_agent: &str) -> Result<Self> {
        let files = match source {
            PackSource::Embedded => embedded_files(),
            PackSource::Local(path) => read_local_dir(path)?,
            PackSource::Remote(base_url) => {
                let zip_bytes = fetch_zip(base_url, user_agent).await?;
                extract_zip(&zip_bytes)?
            }
        };
        Self::from_files(files)
    }

    /// The pack compiled into the binary
    pub fn embedded() -> Result<Self> {
        Self::from_files(embedded_files())
    }

    fn from_files(files: BTreeMap<String, Vec<u8>>) -> Result<Self> {
        let manifest_src = text_file(&files, MANIFEST_FILE)?;
        let manifest = PackManifest::from_yaml(manifest_src)
            .with_context(|| format!("Failed to parse {}", MANIFEST_FILE))?;
        let catalog = Catalog::from_yaml(text_file(&files, CATALOG_FILE)?)?;

        if let Some(missing) = manifest
            .source_files()
            .into_iter()
            .find(|f| !files.contains_key(*f))
        {
            anyhow::bail!(
                "File '{}' listed in {} is missing from the pack",
                missing,
                MANIFEST_FILE
            );
        }

        Ok(Self {
            manifest,
            catalog,
            files,
        })
    }

    /// Replace the pack's module catalog (e.g. with a `--catalog` override)
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn file(&self, path: &str) -> Result<&[u8]> {
        self.files
            .get(path)
            .map(Vec::as_slice)
            .ok_or_else(|| anyhow::anyhow!("File '{}' not found in template pack", path))
    }
}

fn text_file<'a>(files: &'a BTreeMap<String, Vec<u8>>, name: &str) -> Result<&'a str> {
    let bytes = files
        .get(name)
        .ok_or_else(|| anyhow::anyhow!("Template pack is missing {}", name))?;
    std::str::from_utf8(bytes).with_context(|| format!("{} is not valid UTF-8", name))
}

fn embedded_files() -> BTreeMap<String, Vec<u8>> {
    fn collect(dir: &Dir<'_>, out: &mut BTreeMap<String, Vec<u8>>) {
        for file in dir.files() {
            out.insert(slash_path(file.path()), file.contents().to_vec());
        }
        for sub in dir.dirs() {
            collect(sub, out);
        }
    }

    let mut files = BTreeMap::new();
    collect(&EMBEDDED_PACK, &mut files);
    files
}

fn read_local_dir(root: &Path) -> Result<BTreeMap<String, Vec<u8>>> {
    if !root.is_dir() {
        anyhow::bail!("Template directory not found: {}", root.display());
    }

    let mut files = BTreeMap::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(root)?;
        let content = std::fs::read(entry.path())
            .with_context(|| format!("Failed to read {}", entry.path().display()))?;
        files.insert(slash_path(relative), content);
    }
    Ok(files)
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Build a URL by appending a path segment, preserving query parameters
fn build_url(base: &Url, path_segment: &str) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("URL cannot have path segments: {}", base))?
        .pop_if_empty()
        .push(path_segment);
    Ok(url)
}

async fn fetch_zip(base_url: &Url, user_agent: &str) -> Result<Vec<u8>> {
    let client = reqwest::Client::builder()
        .user_agent(user_agent)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());

    let zip_url = build_url(base_url, &format!("{}.zip", PACK_NAME))?;
    let response = client
        .get(zip_url.clone())
        .send()
        .await
        .with_context(|| format!("Failed to fetch template pack from {}", zip_url))?;

    if !response.status().is_success() {
        anyhow::bail!(
            "Failed to fetch template pack from {}: HTTP {}",
            zip_url,
            response.status()
        );
    }

    Ok(response.bytes().await?.to_vec())
}

/// Extract a pack zip; entries live under a `<pack name>/` directory
fn extract_zip(zip_bytes: &[u8]) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut archive =
        ZipArchive::new(Cursor::new(zip_bytes)).context("Failed to read template pack zip")?;

    let prefix = format!("{}/", PACK_NAME);
    let mut files = BTreeMap::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }

        let full_path = file.name().to_string();
        let relative = full_path
            .strip_prefix(&prefix)
            .unwrap_or(&full_path)
            .to_string();

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        files.insert(relative, contents);
    }

    Ok(files)
}

/// Build the distributable zip for a local pack directory.
///
/// Only the manifest, the catalog and files the manifest lists are included.
pub fn build_pack_zip(pack_dir: &Path) -> Result<Vec<u8>> {
    let files = read_local_dir(pack_dir)?;
    let pack = TemplatePack::from_files(files)?;

    let mut zip_buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut zip_buffer));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        let mut names = vec![MANIFEST_FILE, CATALOG_FILE];
        names.extend(pack.manifest.source_files());

        for name in names {
            zip.start_file(format!("{}/{}", PACK_NAME, name), options)?;
            zip.write_all(pack.file(name)?)?;
        }

        zip.finish()?;
    }

    Ok(zip_buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_pack_is_complete() {
        let pack = TemplatePack::embedded().unwrap();
        assert_eq!(pack.manifest.name, PACK_NAME);
        assert!(pack.file("_package.json").is_ok());
        assert!(pack.file("src/templates/layout.html").is_ok());
        assert!(pack.file("nope.txt").is_err());
    }

    #[test]
    fn test_build_url_appends_segment() {
        let base = Url::parse("https://example.com/packs/?ref=main").unwrap();
        let url = build_url(&base, "plump.zip").unwrap();
        assert_eq!(url.as_str(), "https://example.com/packs/plump.zip?ref=main");
    }

    #[test]
    fn test_zip_round_trip_through_local_dir() {
        let dir = tempfile::tempdir().unwrap();
        let pack_dir = dir.path().join("plump");
        for (name, bytes) in embedded_files() {
            let path = pack_dir.join(&name);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, bytes).unwrap();
        }
        // Unlisted files stay out of the zip.
        std::fs::write(pack_dir.join("notes.txt"), "scratch").unwrap();

        let zip_bytes = build_pack_zip(&pack_dir).unwrap();
        let files = extract_zip(&zip_bytes).unwrap();
        assert!(!files.contains_key("notes.txt"));

        let pack = TemplatePack::from_files(files).unwrap();
        assert_eq!(
            pack.file("gitignore").unwrap(),
            TemplatePack::embedded().unwrap().file("gitignore").unwrap()
        );
    }

    #[test]
    fn test_missing_source_file_rejected() {
        let mut files = embedded_files();
        files.remove("jshintrc");
        let err = TemplatePack::from_files(files).unwrap_err();
        assert!(err.to_string().contains("jshintrc"));
    }
}
