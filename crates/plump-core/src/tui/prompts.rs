//! Charm-style CLI prompts using cliclack

use crate::answers::Answers;
use crate::catalog::{Catalog, Group};
use crate::product::ProductConfig;
use crate::runtime::{check, tool};
use crate::templates::{generate, version, PackSource, TemplatePack};
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Project name used when nothing better is available
const FALLBACK_NAME: &str = "my-site";

/// CLI arguments for the create command
#[derive(Debug, Clone, Default)]
pub struct CreateArgs {
    /// Local directory to use for templates instead of the built-in pack
    pub template_dir: Option<PathBuf>,

    /// Project directory to create
    pub directory: Option<PathBuf>,

    /// Project name (defaults to the directory name)
    pub name: Option<String>,

    /// Modules chosen on the command line, keyed by catalog group
    pub modules: BTreeMap<String, Vec<String>>,

    /// Module catalog replacing the pack's own
    pub catalog: Option<PathBuf>,

    /// Optimize PNGs in the `images` task
    pub minify_images: Option<bool>,

    /// Enable FTP staging in the generated settings
    pub staging: Option<bool>,

    /// Run `npm install` and `bower install` without asking
    pub install: bool,

    /// Auto-confirm all prompts (non-interactive mode)
    pub yes: bool,
}

/// Run the CLI with interactive prompts
pub async fn run<C: ProductConfig>(config: &C, args: CreateArgs, cli_version: &str) -> Result<()> {
    cliclack::intro(config.display_name())?;

    // Step 1: Load the template pack (and any catalog override)
    let pack = load_pack(config, &args).await?;

    if let Some(warning) =
        version::check_compatibility(cli_version, &pack.manifest.version, config.upgrade_command())
    {
        cliclack::log::warning(format!(
            "Version warning: {}",
            warning.lines().next().unwrap_or(&warning)
        ))?;
    }

    // Step 2: Where and what
    let project_dir = select_directory(&args)?;
    let project_name = select_name(&args, &project_dir)?;

    // Step 3: Module choices, one prompt per catalog group
    let mut answers = Answers::new(project_name);
    for group in &pack.catalog.groups {
        select_modules(group, &args, &mut answers)?;
    }
    if let Some(unknown) = args
        .modules
        .keys()
        .find(|key| pack.catalog.group(key).is_none())
    {
        let known: Vec<&str> = pack.catalog.groups.iter().map(|g| g.name.as_str()).collect();
        anyhow::bail!(
            "Unknown module group '{}'. Available groups: {}",
            unknown,
            known.join(", ")
        );
    }

    // Step 4: Build options
    select_options(&args, &mut answers)?;
    answers.validate(&pack.catalog)?;

    // Step 5: Write the project
    create_project(&pack, &answers, &project_dir).await?;

    // Step 6: Tools the generated project needs (advisory)
    check_tools()?;
    let installed = install_dependencies(&args, &project_dir).await?;

    // Step 7: Show next steps
    print_next_steps(config, &project_dir, installed)?;

    Ok(())
}

async fn load_pack<C: ProductConfig>(config: &C, args: &CreateArgs) -> Result<TemplatePack> {
    let source = PackSource::resolve(config, args.template_dir.as_deref())?;
    cliclack::log::info(format!("Using {}", source.describe()))?;

    let spinner = cliclack::spinner();
    spinner.start("Loading templates...");

    let mut pack = match TemplatePack::load(&source, config.user_agent()).await {
        Ok(pack) => pack,
        Err(e) => {
            spinner.stop("Failed to load templates");
            return Err(e);
        }
    };
    spinner.stop(format!(
        "Template: {} - {}",
        pack.manifest.name, pack.manifest.description
    ));

    if let Some(path) = &args.catalog {
        let catalog = Catalog::load(path)?;
        cliclack::log::info(format!("Using module catalog from {}", path.display()))?;
        pack = pack.with_catalog(catalog);
    }

    Ok(pack)
}

fn select_directory(args: &CreateArgs) -> Result<PathBuf> {
    let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    // Use --directory flag if provided
    let path = if let Some(dir) = &args.directory {
        let p = if dir.is_absolute() {
            dir.clone()
        } else {
            current_dir.join(dir)
        };
        cliclack::log::info(format!("Using directory: {}", p.display()))?;
        p
    } else if args.yes {
        current_dir
    } else {
        let input: String = cliclack::input("Project directory")
            .placeholder(".")
            .default_input(".")
            .interact()?;

        if input.is_empty() || input == "." {
            current_dir
        } else {
            let p = PathBuf::from(&input);
            if p.is_absolute() {
                p
            } else {
                current_dir.join(p)
            }
        }
    };

    // Validate parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.exists() && parent != Path::new("") {
            anyhow::bail!("Parent directory does not exist: {}", parent.display());
        }
    }

    // Warn if directory exists and has files
    if path.is_dir() {
        if let Ok(entries) = std::fs::read_dir(&path) {
            let count = entries.count();
            if count > 0 {
                cliclack::log::warning(format!("Directory has {} existing items", count))?;

                // Auto-confirm with --yes flag
                let confirm = if args.yes {
                    true
                } else {
                    cliclack::confirm("Continue anyway? Existing files may be overwritten")
                        .initial_value(true)
                        .interact()?
                };

                if !confirm {
                    anyhow::bail!("Setup cancelled.");
                }
            }
        }
    }

    Ok(path)
}

/// The directory's own name, if it makes a usable default
fn default_name(project_dir: &Path) -> String {
    project_dir
        .file_name()
        .map(|n| n.to_string_lossy().trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| FALLBACK_NAME.to_string())
}

fn select_name(args: &CreateArgs, project_dir: &Path) -> Result<String> {
    if let Some(name) = &args.name {
        let name = name.trim();
        if name.is_empty() {
            anyhow::bail!("Project name must not be empty");
        }
        return Ok(name.to_string());
    }

    let default = default_name(project_dir);
    if args.yes {
        cliclack::log::info(format!("Project name: {}", default))?;
        return Ok(default);
    }

    let name: String = cliclack::input("Project name")
        .placeholder(&default)
        .default_input(&default)
        .validate(|input: &String| {
            if input.trim().is_empty() {
                Err("Please enter a project name")
            } else {
                Ok(())
            }
        })
        .interact()?;

    Ok(name.trim().to_string())
}

fn select_modules(group: &Group, args: &CreateArgs, answers: &mut Answers) -> Result<()> {
    let from_args = args
        .modules
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(&group.name))
        .map(|(_, modules)| modules.clone());

    let chosen: Vec<String> = match from_args {
        Some(modules) => modules,
        // Non-interactive mode selects nothing it was not told to
        None if args.yes => Vec::new(),
        None => {
            let mut multi = cliclack::multiselect(&group.message);
            for module in group.choices() {
                multi = multi.item(
                    module.to_string(),
                    module,
                    group.layer_of(module).unwrap_or(""),
                );
            }
            multi.required(false).interact()?
        }
    };

    answers.select(&group.name, chosen);

    let selected = answers.selected_in(&group.name);
    let summary = if selected.is_empty() {
        "none".to_string()
    } else {
        selected.join(", ")
    };
    cliclack::log::success(format!("{} modules: {}", group.display_name(), summary))?;

    Ok(())
}

fn ask(prompt: &str, flag: Option<bool>, default: bool, yes: bool) -> Result<bool> {
    match flag {
        Some(value) => Ok(value),
        None if yes => Ok(default),
        None => Ok(cliclack::confirm(prompt).initial_value(default).interact()?),
    }
}

fn select_options(args: &CreateArgs, answers: &mut Answers) -> Result<()> {
    answers.minify_images = ask(
        "Minify images during the build?",
        args.minify_images,
        true,
        args.yes,
    )?;
    answers.staging = ask(
        "Deploy to an FTP staging server?",
        args.staging,
        false,
        args.yes,
    )?;
    Ok(())
}

async fn create_project(pack: &TemplatePack, answers: &Answers, project_dir: &Path) -> Result<()> {
    let spinner = cliclack::spinner();
    spinner.start("Creating project...");

    let written = match generate(pack, answers, project_dir).await {
        Ok(written) => written,
        Err(e) => {
            spinner.stop("Failed to create project");
            return Err(e);
        }
    };

    spinner.stop(format!(
        "Created {} files in {}",
        written.len(),
        project_dir.display()
    ));

    if answers.staging {
        cliclack::log::remark("Fill in the staging section of plump-config.json before running `stage`")?;
    }

    Ok(())
}

fn check_tools() -> Result<()> {
    let spinner = cliclack::spinner();
    spinner.start("Checking tools...");

    let report = check::check_tools();
    let detected: Vec<String> = report.iter().map(|r| r.describe()).collect();
    spinner.stop(format!("Detected tools: {}", detected.join(", ")));

    for missing in report.iter().filter(|r| !r.available) {
        cliclack::log::warning(format!(
            "{} was not found. {}",
            missing.tool,
            missing.tool.install_hint()
        ))?;
    }

    Ok(())
}

/// Returns whether every install step ran
async fn install_dependencies(args: &CreateArgs, project_dir: &Path) -> Result<bool> {
    let proceed = if args.install {
        true
    } else if args.yes {
        false
    } else {
        cliclack::confirm("Install npm and bower dependencies now?")
            .initial_value(false)
            .interact()?
    };

    if !proceed {
        return Ok(false);
    }

    match tool::install_dependencies(project_dir).await {
        Ok(skipped) if skipped.is_empty() => {
            cliclack::log::success("Dependencies installed")?;
            Ok(true)
        }
        Ok(skipped) => {
            for step in &skipped {
                cliclack::log::warning(format!(
                    "Skipped `{}`: {} is not installed",
                    step.command_line(),
                    step.tool
                ))?;
            }
            Ok(false)
        }
        Err(e) => {
            // The project itself is fine; the user can rerun the installs
            cliclack::log::error(format!("{:#}", e))?;
            Ok(false)
        }
    }
}

fn print_next_steps<C: ProductConfig>(
    config: &C,
    project_dir: &Path,
    dependencies_installed: bool,
) -> Result<()> {
    let steps = config.next_steps(project_dir, dependencies_installed);

    println!();
    println!("  Next steps");
    println!();

    for (i, step) in steps.iter().enumerate() {
        println!("  {}.  {}", i + 1, step);
    }

    cliclack::outro(format!("Happy hacking! Docs: {}", config.docs_url()))?;

    Ok(())
}
