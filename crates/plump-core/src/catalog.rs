//! Module catalog: the selectable inuitcss/plumpcss modules
//!
//! The catalog is plain configuration data shipped in the template pack
//! (`catalog.yaml`). Modules are grouped by framework and, inside a group,
//! by shearing layer.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Shearing layers in the order their imports must appear in the Sass entry point.
pub const LAYER_ORDER: &[&str] = &["settings", "tools", "generic", "base", "objects", "trumps"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("failed to parse module catalog: {0}")]
    Parse(String),

    #[error("module catalog has no groups")]
    Empty,

    #[error("duplicate group '{0}' in module catalog")]
    DuplicateGroup(String),

    #[error("module '{module}' appears more than once in group '{group}'")]
    DuplicateModule { group: String, module: String },

    #[error("unknown layer '{layer}' in group '{group}' (expected one of: {expected})")]
    UnknownLayer {
        group: String,
        layer: String,
        expected: String,
    },
}

/// Modules belonging to one shearing layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub layer: String,
    #[serde(default)]
    pub modules: Vec<String>,
}

/// A framework's set of modules, offered as one checkbox prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    /// Key used on the command line and in answers (e.g. `inuit`)
    pub name: String,

    /// Human-readable name
    #[serde(default)]
    pub display_name: Option<String>,

    /// Prefix prepended to a module name to get its bower package
    pub package_prefix: String,

    /// Bower version range written for every selected package
    #[serde(default = "default_version")]
    pub version: String,

    /// Prompt shown to the user
    pub message: String,

    pub categories: Vec<Category>,
}

fn default_version() -> String {
    "*".to_string()
}

impl Group {
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Module names in catalog order, as offered to the user
    pub fn choices(&self) -> Vec<&str> {
        self.categories
            .iter()
            .flat_map(|c| c.modules.iter().map(String::as_str))
            .collect()
    }

    pub fn contains(&self, module: &str) -> bool {
        self.categories
            .iter()
            .any(|c| c.modules.iter().any(|m| m == module))
    }

    /// The layer a module belongs to
    pub fn layer_of(&self, module: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| c.modules.iter().any(|m| m == module))
            .map(|c| c.layer.as_str())
    }

    /// Bower package name for a module (`inuitcss-defaults`)
    pub fn package_name(&self, module: &str) -> String {
        format!("{}{}", self.package_prefix, module)
    }

    /// Sass import path for a module, relative to the bower components directory
    pub fn import_path(&self, module: &str) -> Option<String> {
        self.layer_of(module)
            .map(|layer| format!("{}/{}.{}", self.package_name(module), layer, module))
    }
}

/// The full module catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub groups: Vec<Group>,
}

impl Catalog {
    /// The catalog shipped with the embedded template pack
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_yaml(include_str!("../templates/plump/catalog.yaml"))
    }

    /// Parse and validate a catalog from YAML
    pub fn from_yaml(content: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog =
            serde_yaml::from_str(content).map_err(|e| CatalogError::Parse(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a catalog override from disk
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        Ok(Self::from_yaml(&content)?)
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name.eq_ignore_ascii_case(name))
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.groups.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut group_names = HashSet::new();
        for group in &self.groups {
            if !group_names.insert(group.name.to_lowercase()) {
                return Err(CatalogError::DuplicateGroup(group.name.clone()));
            }

            let mut seen = HashSet::new();
            for category in &group.categories {
                if !LAYER_ORDER.contains(&category.layer.as_str()) {
                    return Err(CatalogError::UnknownLayer {
                        group: group.name.clone(),
                        layer: category.layer.clone(),
                        expected: LAYER_ORDER.join(", "),
                    });
                }
                for module in &category.modules {
                    if !seen.insert(module.as_str()) {
                        return Err(CatalogError::DuplicateModule {
                            group: group.name.clone(),
                            module: module.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}
