//! Template pack manifest types and parsing

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One file the generator writes into a new project
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackEntry {
    /// Path inside the template pack
    pub source: String,

    /// Destination path in the project (defaults to source if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<String>,

    /// Run the file through the template engine instead of copying bytes.
    /// HTML templates for the `templates` task must stay unrendered.
    #[serde(default)]
    pub render: bool,
}

impl PackEntry {
    /// Get the destination path (falls back to source if dest not specified)
    pub fn destination(&self) -> &str {
        self.dest.as_deref().unwrap_or(&self.source)
    }
}

/// Pack manifest (`template.yaml`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackManifest {
    /// Name of the pack, also the zip's top-level directory
    pub name: String,

    /// Description of what the pack provides
    pub description: String,

    /// Semver version for CLI compatibility checking
    pub version: String,

    /// Directories created even when no file lands in them
    #[serde(default)]
    pub directories: Vec<String>,

    /// Explicit list of files to write
    pub files: Vec<PackEntry>,
}

impl PackManifest {
    pub fn from_yaml(content: &str) -> Result<Self> {
        let manifest: PackManifest = serde_yaml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Destination paths the generator produces, in manifest order
    pub fn expected_files(&self) -> Vec<&str> {
        self.files.iter().map(PackEntry::destination).collect()
    }

    /// Source paths referenced by the manifest
    pub fn source_files(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.source.as_str()).collect()
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for entry in &self.files {
            let dest = entry.destination();
            if !is_relative_inside(dest) || !is_relative_inside(&entry.source) {
                anyhow::bail!("Pack entry '{}' escapes the project directory", dest);
            }
            if !seen.insert(dest) {
                anyhow::bail!("Pack writes '{}' more than once", dest);
            }
        }
        if let Some(dir) = self.directories.iter().find(|d| !is_relative_inside(d)) {
            anyhow::bail!("Pack directory '{}' escapes the project directory", dir);
        }
        Ok(())
    }
}

fn is_relative_inside(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with('/')
        && !path.contains('\\')
        && path.split('/').all(|part| part != ".." && !part.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest() {
        let manifest = PackManifest::from_yaml(
            r#"
name: plump
description: test
version: 0.1.0
directories: [src/images]
files:
  - source: _package.json
    dest: package.json
    render: true
  - source: src/index.html
"#,
        )
        .unwrap();

        assert_eq!(manifest.expected_files(), vec!["package.json", "src/index.html"]);
        assert!(manifest.files[0].render);
        assert!(!manifest.files[1].render);
    }

    #[test]
    fn test_duplicate_destination_rejected() {
        let err = PackManifest::from_yaml(
            r#"
name: plump
description: test
version: 0.1.0
files:
  - source: a
    dest: out
  - source: out
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_escaping_paths_rejected() {
        for dest in ["../evil", "/etc/passwd", "a//b"] {
            let yaml = format!(
                "name: p\ndescription: d\nversion: 0.1.0\nfiles:\n  - source: a\n    dest: \"{}\"\n",
                dest
            );
            assert!(PackManifest::from_yaml(&yaml).is_err(), "{}", dest);
        }
    }
}
