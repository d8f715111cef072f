//! End-to-end checks of project generation against the embedded pack

use plump_core::build::{self, TaskContext, SETTINGS_FILE};
use plump_core::{generate, Answers, Settings, TemplatePack};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

fn files_under(root: &Path) -> BTreeSet<String> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .collect()
}

/// Every module selection shape crossed with both boolean answers
fn answer_combinations(pack: &TemplatePack) -> Vec<Answers> {
    let mut combos = Vec::new();
    for minify_images in [true, false] {
        for staging in [true, false] {
            for selection in ["none", "first", "all"] {
                let mut answers = Answers::new("combo-site");
                answers.minify_images = minify_images;
                answers.staging = staging;
                for group in &pack.catalog.groups {
                    let choices = group.choices();
                    let chosen: Vec<&str> = match selection {
                        "none" => Vec::new(),
                        "first" => choices.into_iter().take(1).collect(),
                        _ => choices,
                    };
                    answers.select(&group.name, chosen);
                }
                combos.push(answers);
            }
        }
    }
    combos
}

#[tokio::test]
async fn generated_files_match_the_manifest_for_every_answer() {
    let pack = TemplatePack::embedded().unwrap();
    let expected: BTreeSet<String> = pack
        .manifest
        .expected_files()
        .into_iter()
        .map(str::to_string)
        .collect();

    for answers in answer_combinations(&pack) {
        let dir = tempfile::tempdir().unwrap();
        let written = generate(&pack, &answers, dir.path()).await.unwrap();

        assert_eq!(files_under(dir.path()), expected, "answers: {:?}", answers);
        assert_eq!(written.len(), expected.len());
        for empty in ["src/images", "src/fonts"] {
            assert!(dir.path().join(empty).is_dir());
        }
    }
}

#[tokio::test]
async fn generating_twice_is_byte_identical() {
    let pack = TemplatePack::embedded().unwrap();
    let mut answers = Answers::new("twice");
    // Selection order must not leak into the output
    answers.select("inuit", ["media", "defaults", "box-sizing"]);

    let mut reordered = Answers::new("twice");
    reordered.select("inuit", ["box-sizing", "defaults", "media"]);

    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    generate(&pack, &answers, first.path()).await.unwrap();
    generate(&pack, &reordered, second.path()).await.unwrap();

    for file in files_under(first.path()) {
        let a = std::fs::read(first.path().join(&file)).unwrap();
        let b = std::fs::read(second.path().join(&file)).unwrap();
        assert_eq!(a, b, "{} differs", file);
    }
}

#[tokio::test]
async fn generated_settings_reflect_answers() {
    let pack = TemplatePack::embedded().unwrap();
    let mut answers = Answers::new("flags");
    answers.minify_images = false;
    answers.staging = true;

    let dir = tempfile::tempdir().unwrap();
    generate(&pack, &answers, dir.path()).await.unwrap();

    let settings = Settings::load(dir.path()).unwrap();
    assert!(!settings.minify_images);
    assert!(settings.staging.enabled);
    settings.validate().unwrap();
    assert!(dir.path().join(SETTINGS_FILE).is_file());
}

#[tokio::test]
async fn generated_project_builds() {
    let pack = TemplatePack::embedded().unwrap();
    let dir = tempfile::tempdir().unwrap();
    generate(&pack, &Answers::new("fresh"), dir.path())
        .await
        .unwrap();

    let settings = Settings::load(dir.path()).unwrap();
    let ctx = Arc::new(TaskContext::new(dir.path(), settings).unwrap());
    build::build(ctx).await.unwrap();

    let css = std::fs::read_to_string(dir.path().join("dev/css/style.css")).unwrap();
    assert!(!css.starts_with("body::before"), "sass failed: {}", css);

    let dev_html = std::fs::read_to_string(dir.path().join("dev/index.html")).unwrap();
    assert!(dev_html.contains("It works."));
    assert!(dev_html.contains("css/style.css"));

    let dist_html = std::fs::read_to_string(dir.path().join("dist/index.html")).unwrap();
    assert!(dist_html.contains("css/style.min.css"));
    assert!(dist_html.contains("js/main.min.js"));
    assert!(dir.path().join("dist/js/main.min.js").is_file());
}

#[test]
fn module_choices_match_the_catalog() {
    let pack = TemplatePack::embedded().unwrap();
    for group in &pack.catalog.groups {
        let choices = group.choices();
        let unique: BTreeSet<&str> = choices.iter().copied().collect();
        assert_eq!(unique.len(), choices.len(), "duplicates in {}", group.name);
        assert!(!choices.is_empty());
    }
    let names: Vec<&str> = pack.catalog.groups.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["inuit", "plump"]);
}
