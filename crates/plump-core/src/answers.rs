//! User answers and the template render context derived from them

use crate::catalog::{Catalog, LAYER_ORDER};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnswerError {
    #[error("unknown module group '{0}'")]
    UnknownGroup(String),

    #[error("'{module}' is not a {group} module (available: {available})")]
    UnknownModule {
        group: String,
        module: String,
        available: String,
    },

    #[error("project name must not be empty")]
    EmptyProjectName,
}

/// Everything the prompts collect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answers {
    pub project_name: String,

    /// Selected module names per group key
    pub selected: BTreeMap<String, Vec<String>>,

    /// Losslessly optimize PNGs during `images`
    pub minify_images: bool,

    /// Enable the `stage` FTP deployment in the generated settings
    pub staging: bool,
}

impl Answers {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            selected: BTreeMap::new(),
            minify_images: true,
            staging: false,
        }
    }

    /// Add modules to a group's selection (duplicates collapse)
    pub fn select<I, S>(&mut self, group: &str, modules: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.selected.entry(group.to_lowercase()).or_default();
        for module in modules {
            let module = module.into();
            if !entry.contains(&module) {
                entry.push(module);
            }
        }
        self
    }

    pub fn selected_in(&self, group: &str) -> &[String] {
        self.selected
            .get(&group.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Selected names must be a subset of the offered choices
    pub fn validate(&self, catalog: &Catalog) -> Result<(), AnswerError> {
        if self.project_name.trim().is_empty() {
            return Err(AnswerError::EmptyProjectName);
        }

        for (group_name, modules) in &self.selected {
            let group = catalog
                .group(group_name)
                .ok_or_else(|| AnswerError::UnknownGroup(group_name.clone()))?;

            if let Some(module) = modules.iter().find(|m| !group.contains(m)) {
                return Err(AnswerError::UnknownModule {
                    group: group.name.clone(),
                    module: module.clone(),
                    available: group.choices().join(", "),
                });
            }
        }

        Ok(())
    }

    /// Build the deterministic render context for the template pack.
    ///
    /// Modules are emitted in catalog order regardless of selection order, so
    /// identical answers always render identical files.
    pub fn template_context(&self, catalog: &Catalog) -> TemplateContext {
        let mut modules = BTreeMap::new();
        let mut bower_dependencies = Vec::new();
        let mut imports_by_layer: BTreeMap<&str, Vec<String>> = BTreeMap::new();

        for group in &catalog.groups {
            let chosen = self.selected_in(&group.name);
            let ordered: Vec<String> = group
                .choices()
                .into_iter()
                .filter(|m| chosen.iter().any(|c| c == *m))
                .map(str::to_string)
                .collect();

            for module in &ordered {
                bower_dependencies.push(BowerDependency {
                    package: group.package_name(module),
                    version: group.version.clone(),
                });
                if let (Some(layer), Some(path)) =
                    (group.layer_of(module), group.import_path(module))
                {
                    imports_by_layer.entry(layer).or_default().push(path);
                }
            }

            modules.insert(group.name.clone(), ordered);
        }

        // Settings always render so the colour partial has a home.
        let sass_layers = LAYER_ORDER
            .iter()
            .filter_map(|layer| {
                let imports = imports_by_layer.remove(layer).unwrap_or_default();
                (*layer == "settings" || !imports.is_empty()).then(|| SassLayer {
                    name: layer.to_string(),
                    imports,
                })
            })
            .collect();

        TemplateContext {
            project_name: self.project_name.clone(),
            modules,
            bower_dependencies,
            sass_layers,
            minify_images: self.minify_images,
            staging: self.staging,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BowerDependency {
    pub package: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SassLayer {
    pub name: String,
    pub imports: Vec<String>,
}

/// Values available to `render: true` template files
#[derive(Debug, Clone, Serialize)]
pub struct TemplateContext {
    pub project_name: String,
    pub modules: BTreeMap<String, Vec<String>>,
    pub bower_dependencies: Vec<BowerDependency>,
    pub sass_layers: Vec<SassLayer>,
    pub minify_images: bool,
    pub staging: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::embedded().unwrap()
    }

    #[test]
    fn test_select_collapses_duplicates() {
        let mut answers = Answers::new("site");
        answers.select("inuit", ["defaults", "box"]);
        answers.select("INUIT", ["box"]);
        assert_eq!(answers.selected_in("inuit"), ["defaults", "box"]);
    }

    #[test]
    fn test_validate_accepts_subset() {
        let mut answers = Answers::new("site");
        answers
            .select("inuit", ["defaults", "media"])
            .select("plump", ["wrapper"]);
        assert_eq!(answers.validate(&catalog()), Ok(()));
    }

    #[test]
    fn test_validate_rejects_unknown_module() {
        let mut answers = Answers::new("site");
        answers.select("plump", ["carousel"]);
        let err = answers.validate(&catalog()).unwrap_err();
        assert!(matches!(err, AnswerError::UnknownModule { ref module, .. } if module == "carousel"));
    }

    #[test]
    fn test_validate_rejects_unknown_group() {
        let mut answers = Answers::new("site");
        answers.select("bootstrap", ["grid"]);
        assert_eq!(
            answers.validate(&catalog()),
            Err(AnswerError::UnknownGroup("bootstrap".to_string()))
        );
    }

    #[test]
    fn test_validate_rejects_blank_project_name() {
        assert_eq!(
            Answers::new("  ").validate(&catalog()),
            Err(AnswerError::EmptyProjectName)
        );
    }

    #[test]
    fn test_context_uses_catalog_order() {
        let mut answers = Answers::new("site");
        answers.select("inuit", ["widths", "defaults", "media"]);
        let ctx = answers.template_context(&catalog());

        assert_eq!(ctx.modules["inuit"], vec!["defaults", "media", "widths"]);
        let packages: Vec<&str> = ctx
            .bower_dependencies
            .iter()
            .map(|d| d.package.as_str())
            .collect();
        assert_eq!(
            packages,
            vec!["inuitcss-defaults", "inuitcss-media", "inuitcss-widths"]
        );
    }

    #[test]
    fn test_context_groups_imports_by_layer() {
        let mut answers = Answers::new("site");
        answers
            .select("plump", ["hide", "wrapper"])
            .select("inuit", ["box-sizing"]);
        let ctx = answers.template_context(&catalog());

        let layers: Vec<&str> = ctx.sass_layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(layers, vec!["settings", "generic", "objects", "trumps"]);
        assert!(ctx.sass_layers[0].imports.is_empty());
        assert_eq!(
            ctx.sass_layers[1].imports,
            vec!["inuitcss-box-sizing/generic.box-sizing"]
        );
        assert_eq!(
            ctx.sass_layers[3].imports,
            vec!["plumpcss-hide/trumps.hide"]
        );
    }

    #[test]
    fn test_context_without_selection() {
        let ctx = Answers::new("empty").template_context(&catalog());
        assert!(ctx.bower_dependencies.is_empty());
        assert_eq!(ctx.sass_layers.len(), 1);
        assert!(ctx.modules["inuit"].is_empty());
    }
}
