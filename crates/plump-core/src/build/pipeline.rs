//! Pipeline tasks: match files, transform, write to `dev/` and `dist/`
//!
//! Everything here is synchronous and runs on the blocking pool.

use super::report;
use super::settings::{compile_globs, glob_base};
use super::task::TaskName;
use super::TaskContext;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tera::Tera;
use walkdir::WalkDir;

/// Directories never searched for inputs
const SKIP_DIRS: &[&str] = &["node_modules", "bower_components", ".git"];

const SCRIPT_BUNDLE: &str = "main.js";
const SCRIPT_BUNDLE_MIN: &str = "main.min.js";

/// Run a file-transforming task, returning the number of inputs processed
pub fn run(task: TaskName, ctx: &TaskContext) -> Result<usize> {
    match task {
        TaskName::Scripts => scripts(ctx),
        TaskName::Styles => styles(ctx),
        TaskName::Templates => templates(ctx),
        TaskName::Images => super::images::run(ctx),
        TaskName::Fonts => fonts(ctx),
        TaskName::Copy => copy(ctx),
        TaskName::Clean => clean(ctx),
        other => anyhow::bail!("'{}' is not a pipeline task", other),
    }
}

/// A file matched by a task's globs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedFile {
    pub path: PathBuf,
    /// Project-relative, `/`-separated
    pub relative: String,
    /// Path relative to the literal base of the glob that matched it
    pub from_base: String,
}

/// Files under the project matching any of `patterns`, sorted by path
pub fn matching_files(ctx: &TaskContext, task: &str, patterns: &[String]) -> Result<Vec<MatchedFile>> {
    let mut found: BTreeMap<String, MatchedFile> = BTreeMap::new();
    let outputs = ctx.output_dirs();

    for pattern in patterns {
        let matcher = compile_globs(task, std::slice::from_ref(pattern))?;
        let base = glob_base(pattern);
        let base_dir = ctx.path(base);
        if !base_dir.is_dir() {
            continue;
        }

        let walker = WalkDir::new(&base_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                let name = e.file_name().to_string_lossy();
                !(e.depth() > 0 && e.file_type().is_dir()
                    && (SKIP_DIRS.contains(&name.as_ref()) || outputs.iter().any(|o| o == e.path())))
            });

        for entry in walker {
            let entry = entry.with_context(|| format!("Failed to walk {}", base_dir.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = slash_relative(entry.path(), &ctx.root)?;
            if found.contains_key(&relative) || !matcher.is_match(&relative) {
                continue;
            }
            let from_base = slash_relative(entry.path(), &base_dir)?;
            found.insert(
                relative.clone(),
                MatchedFile {
                    path: entry.path().to_path_buf(),
                    relative,
                    from_base,
                },
            );
        }
    }

    Ok(found.into_values().collect())
}

fn slash_relative(path: &Path, base: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(base)
        .with_context(|| format!("{} is outside {}", path.display(), base.display()))?;
    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

/// Write `bytes` to `dir/relative`, creating parent directories
pub fn write_output(dir: &Path, relative: &str, bytes: &[u8]) -> Result<()> {
    let target = dir.join(relative);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(&target, bytes)
        .with_context(|| format!("Failed to write file: {}", target.display()))
}

/// Concatenate scripts into `dev/js/main.js`, minify into `dist/js/main.min.js`
fn scripts(ctx: &TaskContext) -> Result<usize> {
    let files = matching_files(ctx, "scripts", &ctx.settings.tasks.scripts)?;
    if files.is_empty() {
        return Ok(0);
    }

    let mut bundle = String::new();
    for file in &files {
        let source = std::fs::read_to_string(&file.path)
            .with_context(|| format!("Failed to read {}", file.relative))?;
        if !bundle.is_empty() {
            bundle.push('\n');
        }
        bundle.push_str(&source);
    }

    write_output(&ctx.dev_dir().join("js"), SCRIPT_BUNDLE, bundle.as_bytes())?;
    let minified = minifier::js::minify(&bundle).to_string();
    write_output(&ctx.dist_dir().join("js"), SCRIPT_BUNDLE_MIN, minified.as_bytes())?;

    Ok(files.len())
}

/// Compile Sass entry points (partials are skipped) into `css/`.
///
/// A compile error does not fail the task: the error is printed and a
/// stylesheet showing the message is written in place of the output.
fn styles(ctx: &TaskContext) -> Result<usize> {
    let entries: Vec<MatchedFile> = matching_files(ctx, "styles", &ctx.settings.tasks.styles)?
        .into_iter()
        .filter(|f| !is_partial(&f.path))
        .collect();

    let load_paths: Vec<PathBuf> = ctx
        .settings
        .sass_load_paths
        .iter()
        .map(|p| ctx.path(p))
        .collect();
    let options = grass::Options::default()
        .style(grass::OutputStyle::Expanded)
        .load_paths(&load_paths);

    for entry in &entries {
        let stem = entry
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "style".to_string());
        let dev_name = format!("{}.css", stem);
        let dist_name = format!("{}.min.css", stem);

        match grass::from_path(&entry.path, &options) {
            Ok(css) => {
                write_output(&ctx.dev_dir().join("css"), &dev_name, css.as_bytes())?;
                let minified = minify_css(&css)
                    .with_context(|| format!("Failed to minify {}", entry.relative))?;
                write_output(&ctx.dist_dir().join("css"), &dist_name, minified.as_bytes())?;
            }
            Err(e) => {
                let message = format!("{}: {}", entry.relative, e);
                report::warn(format!("Sass error in {}", message));
                let banner = error_banner_css(&message);
                write_output(&ctx.dev_dir().join("css"), &dev_name, banner.as_bytes())?;
                write_output(&ctx.dist_dir().join("css"), &dist_name, banner.as_bytes())?;
            }
        }
    }

    Ok(entries.len())
}

fn is_partial(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('_'))
}

fn minify_css(css: &str) -> Result<String> {
    minifier::css::minify(css)
        .map(|m| m.to_string())
        .map_err(|e| anyhow::anyhow!("{}", e))
}

/// A stylesheet that renders `message` at the top of every page
pub fn error_banner_css(message: &str) -> String {
    let escaped = message
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\A ");
    format!(
        "body::before {{\n  \
           content: \"{}\";\n  \
           display: block;\n  \
           padding: 1em;\n  \
           background: #c00;\n  \
           color: #fff;\n  \
           font: 14px/1.4 monospace;\n  \
           white-space: pre-wrap;\n\
         }}\n",
        escaped
    )
}

/// Render HTML pages with every `.html` under `src/` available for
/// `extends`/`include`
fn templates(ctx: &TaskContext) -> Result<usize> {
    let pages = matching_files(ctx, "templates", &ctx.settings.tasks.templates)?;
    if pages.is_empty() {
        return Ok(0);
    }

    let src = ctx.src_dir();
    let all_html = vec!["**/*.html".to_string()];
    let mut sources = Vec::new();
    for file in matching_files(ctx, "templates", &prefixed(&ctx.settings.src, &all_html))? {
        let name = slash_relative(&file.path, &src)?;
        let content = std::fs::read_to_string(&file.path)
            .with_context(|| format!("Failed to read {}", file.relative))?;
        sources.push((name, content));
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(sources)
        .context("Failed to load templates")?;

    // `min` selects the asset names of each output: `style.css` vs `style.min.css`
    let mut dev_context = tera::Context::new();
    dev_context.insert("min", "");
    let mut dist_context = tera::Context::new();
    dist_context.insert("min", ".min");

    for page in &pages {
        let name = slash_relative(&page.path, &src)?;
        for (dir, context) in [(ctx.dev_dir(), &dev_context), (ctx.dist_dir(), &dist_context)] {
            let html = tera
                .render(&name, context)
                .with_context(|| format!("Failed to render {}", page.relative))?;
            write_output(&dir, &page.from_base, html.as_bytes())?;
        }
    }

    Ok(pages.len())
}

fn prefixed(dir: &Path, patterns: &[String]) -> Vec<String> {
    let dir = dir.to_string_lossy();
    let dir = dir.trim_end_matches('/');
    patterns
        .iter()
        .map(|p| {
            if dir.is_empty() || dir == "." {
                p.clone()
            } else {
                format!("{}/{}", dir, p)
            }
        })
        .collect()
}

fn fonts(ctx: &TaskContext) -> Result<usize> {
    let files = matching_files(ctx, "fonts", &ctx.settings.tasks.fonts)?;
    let [dev, dist] = ctx.output_dirs();
    for file in &files {
        let bytes = std::fs::read(&file.path)
            .with_context(|| format!("Failed to read {}", file.relative))?;
        write_output(&dev.join("fonts"), &file.from_base, &bytes)?;
        write_output(&dist.join("fonts"), &file.from_base, &bytes)?;
    }
    Ok(files.len())
}

/// Copy the extra files listed in `tasks.copy`, keeping paths relative to `copy_base`
fn copy(ctx: &TaskContext) -> Result<usize> {
    let files = matching_files(ctx, "copy", &ctx.settings.tasks.copy)?;
    let relatives: Vec<String> = files.iter().map(|f| f.relative.clone()).collect();
    if let Some((file, task)) = ctx.settings.overlaps_in(&relatives)?.first() {
        anyhow::bail!(
            "{} is matched by both copy and {}; narrow tasks.copy",
            file,
            task
        );
    }

    let copy_base = ctx.path(&ctx.settings.copy_base);
    for file in &files {
        let relative = slash_relative(&file.path, &copy_base)
            .unwrap_or_else(|_| file.relative.clone());
        let bytes = std::fs::read(&file.path)
            .with_context(|| format!("Failed to read {}", file.relative))?;
        for dir in ctx.output_dirs() {
            write_output(&dir, &relative, &bytes)?;
        }
    }
    Ok(files.len())
}

fn clean(ctx: &TaskContext) -> Result<usize> {
    let mut removed = 0;
    for dir in ctx.output_dirs() {
        if dir.exists() {
            std::fs::remove_dir_all(&dir)
                .with_context(|| format!("Failed to remove {}", dir.display()))?;
            removed += 1;
        }
    }
    Ok(removed)
}
