//! Project generation: render and copy the pack into a target directory

use crate::answers::Answers;
use crate::templates::fetcher::TemplatePack;
use anyhow::{Context, Result};
use std::path::Path;
use tera::Tera;
use tokio::fs;

/// Write every file the pack declares into `target_dir`.
///
/// Returns the destination paths written, in manifest order. The output only
/// depends on the pack and the answers, so identical inputs produce
/// byte-identical projects.
pub async fn generate(
    pack: &TemplatePack,
    answers: &Answers,
    target_dir: &Path,
) -> Result<Vec<String>> {
    answers.validate(&pack.catalog)?;

    let context = tera::Context::from_serialize(answers.template_context(&pack.catalog))
        .context("Failed to build template context")?;

    // Ensure target directory exists
    fs::create_dir_all(target_dir)
        .await
        .context("Failed to create target directory")?;

    for dir in &pack.manifest.directories {
        let path = target_dir.join(dir);
        fs::create_dir_all(&path)
            .await
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    }

    let mut written = Vec::with_capacity(pack.manifest.files.len());

    for entry in &pack.manifest.files {
        let dest = entry.destination();
        let target_path = target_dir.join(dest);
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let source = pack.file(&entry.source)?;
        let content = if entry.render {
            render(&entry.source, source, &context)?.into_bytes()
        } else {
            source.to_vec()
        };

        fs::write(&target_path, &content)
            .await
            .with_context(|| format!("Failed to write file: {}", target_path.display()))?;

        written.push(dest.to_string());
    }

    Ok(written)
}

fn render(name: &str, source: &[u8], context: &tera::Context) -> Result<String> {
    let text =
        std::str::from_utf8(source).with_context(|| format!("{} is not valid UTF-8", name))?;
    Tera::one_off(text, context, false).with_context(|| format!("Failed to render {}", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn generate_into(answers: &Answers) -> (tempfile::TempDir, Vec<String>) {
        let pack = TemplatePack::embedded().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let written = generate(&pack, answers, dir.path()).await.unwrap();
        (dir, written)
    }

    #[tokio::test]
    async fn test_bower_json_lists_selected_packages() {
        let mut answers = Answers::new("demo");
        answers
            .select("inuit", ["defaults", "media"])
            .select("plump", ["wrapper"]);
        let (dir, _) = generate_into(&answers).await;

        let bower: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.path().join("bower.json")).unwrap())
                .unwrap();
        assert_eq!(bower["name"], "demo");
        let deps = bower["dependencies"].as_object().unwrap();
        let names: Vec<&str> = deps.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec!["inuitcss-defaults", "inuitcss-media", "plumpcss-wrapper"]
        );
    }

    #[tokio::test]
    async fn test_empty_selection_still_valid_json() {
        let (dir, _) = generate_into(&Answers::new("bare")).await;
        for file in ["bower.json", "package.json", "plump-config.json"] {
            let bytes = std::fs::read(dir.path().join(file)).unwrap();
            serde_json::from_slice::<serde_json::Value>(&bytes)
                .unwrap_or_else(|e| panic!("{} is not JSON: {}", file, e));
        }
    }

    #[tokio::test]
    async fn test_quoted_project_name_stays_valid_json() {
        let name = r#"Bob's "site" \ */ beta"#;
        let (dir, _) = generate_into(&Answers::new(name)).await;

        for file in ["bower.json", "package.json"] {
            let bytes = std::fs::read(dir.path().join(file)).unwrap();
            let json: serde_json::Value = serde_json::from_slice(&bytes)
                .unwrap_or_else(|e| panic!("{} is not JSON: {}", file, e));
            assert_eq!(json["name"], name);
        }
        let package: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.path().join("package.json")).unwrap())
                .unwrap();
        assert_eq!(package["description"], format!("{} front-end", name));

        // The name cannot close the banner comment early
        let script = std::fs::read_to_string(dir.path().join("src/scripts/main.js")).unwrap();
        let banner = script.lines().next().unwrap();
        assert_eq!(banner.matches("*/").count(), 1);
        assert!(banner.ends_with("*/"));
    }

    #[tokio::test]
    async fn test_style_entry_imports_in_layer_order() {
        let mut answers = Answers::new("demo");
        answers
            .select("plump", ["hide"])
            .select("inuit", ["box-sizing", "defaults"]);
        let (dir, _) = generate_into(&answers).await;

        let scss = std::fs::read_to_string(dir.path().join("src/styles/style.scss")).unwrap();
        let defaults = scss.find("inuitcss-defaults/settings.defaults").unwrap();
        let colors = scss.find("\"settings.colors.scss\"").unwrap();
        let generic = scss.find("inuitcss-box-sizing/generic.box-sizing").unwrap();
        let trumps = scss.find("plumpcss-hide/trumps.hide").unwrap();
        assert!(colors < defaults && defaults < generic && generic < trumps);
    }

    #[tokio::test]
    async fn test_html_templates_copied_verbatim() {
        let (dir, _) = generate_into(&Answers::new("demo")).await;
        let index = std::fs::read_to_string(dir.path().join("src/index.html")).unwrap();
        assert!(index.contains("{% extends \"templates/layout.html\" %}"));
    }

    #[tokio::test]
    async fn test_settings_flags_rendered() {
        let mut answers = Answers::new("demo");
        answers.minify_images = false;
        answers.staging = true;
        let (dir, _) = generate_into(&answers).await;

        let config: serde_json::Value = serde_json::from_slice(
            &std::fs::read(dir.path().join("plump-config.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(config["minify_images"], false);
        assert_eq!(config["staging"]["enabled"], true);
    }

    #[tokio::test]
    async fn test_invalid_answers_write_nothing() {
        let pack = TemplatePack::embedded().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("project");
        let mut answers = Answers::new("demo");
        answers.select("plump", ["nope"]);

        assert!(generate(&pack, &answers, &target).await.is_err());
        assert!(!target.exists());
    }
}
