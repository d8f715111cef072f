//! Running the package managers inside a freshly generated project
//!
//! Output of each command is streamed to the terminal as it arrives.

use super::check::{check_tool, Tool};
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

/// Timeout for a single install command
const INSTALL_TIMEOUT: Duration = Duration::from_secs(300);

/// One package-manager invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallStep {
    pub tool: Tool,
    pub args: &'static [&'static str],
}

impl InstallStep {
    pub fn command_line(&self) -> String {
        format!("{} {}", self.tool.binary(), self.args.join(" "))
    }
}

/// `npm install` then `bower install`
pub const INSTALL_STEPS: [InstallStep; 2] = [
    InstallStep {
        tool: Tool::Npm,
        args: &["install"],
    },
    InstallStep {
        tool: Tool::Bower,
        args: &["install"],
    },
];

/// Run every install step whose tool is available, in order.
///
/// Returns the steps that were skipped because their tool is missing.
pub async fn install_dependencies(project_dir: &Path) -> Result<Vec<InstallStep>> {
    let mut skipped = Vec::new();
    for step in INSTALL_STEPS {
        if !check_tool(step.tool).available {
            skipped.push(step);
            continue;
        }
        run_step(&step, project_dir).await?;
    }
    Ok(skipped)
}

async fn run_step(step: &InstallStep, project_dir: &Path) -> Result<()> {
    let cmd = step.command_line();
    println!();
    println!("{} {}", "Running:".dimmed(), cmd.yellow());
    println!();

    let mut child = TokioCommand::new(step.tool.binary())
        .args(step.args)
        .current_dir(project_dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to start {}", cmd))?;

    let stdout = child
        .stdout
        .take()
        .context("Failed to capture stdout")?;
    let stderr = child
        .stderr
        .take()
        .context("Failed to capture stderr")?;

    let mut stdout_reader = BufReader::new(stdout).lines();
    let mut stderr_reader = BufReader::new(stderr).lines();

    let output_task = async {
        let mut stderr_open = true;
        loop {
            tokio::select! {
                line = stdout_reader.next_line() => {
                    match line {
                        Ok(Some(line)) => println!("  {}", line),
                        Ok(None) => break,
                        Err(e) => {
                            eprintln!("{} {}", "Error reading stdout:".red(), e);
                            break;
                        }
                    }
                }
                line = stderr_reader.next_line(), if stderr_open => {
                    match line {
                        Ok(Some(line)) => eprintln!("  {}", line.yellow()),
                        Ok(None) => stderr_open = false,
                        Err(e) => {
                            eprintln!("{} {}", "Error reading stderr:".red(), e);
                            stderr_open = false;
                        }
                    }
                }
            }
        }
    };

    if timeout(INSTALL_TIMEOUT, output_task).await.is_err() {
        let _ = child.kill().await;
        anyhow::bail!(
            "`{}` timed out after {} seconds. Run it manually inside {}",
            cmd,
            INSTALL_TIMEOUT.as_secs(),
            project_dir.display()
        );
    }

    match timeout(Duration::from_secs(10), child.wait()).await {
        Ok(Ok(status)) if status.success() => Ok(()),
        Ok(Ok(status)) => anyhow::bail!(
            "`{}` failed with exit code: {}",
            cmd,
            status.code().unwrap_or(-1)
        ),
        Ok(Err(e)) => anyhow::bail!("Failed to wait for `{}`: {}", cmd, e),
        Err(_) => {
            let _ = child.kill().await;
            anyhow::bail!("`{}` hung after closing its output", cmd);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_order() {
        let lines: Vec<String> = INSTALL_STEPS.iter().map(|s| s.command_line()).collect();
        assert_eq!(lines, vec!["npm install", "bower install"]);
    }
}
