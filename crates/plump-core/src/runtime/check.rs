//! Detection of Node.js, npm and Bower

use std::fmt;
use std::process::Command;

/// External tools a generated project relies on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Node,
    Npm,
    Bower,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::Node, Tool::Npm, Tool::Bower];

    pub fn display_name(&self) -> &'static str {
        match self {
            Tool::Node => "Node.js",
            Tool::Npm => "npm",
            Tool::Bower => "Bower",
        }
    }

    pub fn binary(&self) -> &'static str {
        match self {
            Tool::Node => "node",
            Tool::Npm => "npm",
            Tool::Bower => "bower",
        }
    }

    pub fn install_hint(&self) -> &'static str {
        match self {
            Tool::Node | Tool::Npm => "install from https://nodejs.org",
            Tool::Bower => "npm install -g bower",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Tool detection result
#[derive(Debug, Clone)]
pub struct RuntimeInfo {
    pub tool: Tool,
    pub version: Option<String>,
    pub available: bool,
}

impl RuntimeInfo {
    pub fn describe(&self) -> String {
        match (&self.version, self.available) {
            (Some(version), true) => format!("{} ({})", self.tool, version),
            (None, true) => format!("{} (unknown version)", self.tool),
            _ => format!("{} (not installed, {})", self.tool, self.tool.install_hint()),
        }
    }
}

/// Check whether a tool is on PATH by asking for its version
pub fn check_tool(tool: Tool) -> RuntimeInfo {
    let output = Command::new(tool.binary()).arg("--version").output();

    match output {
        Ok(out) if out.status.success() => {
            let version = String::from_utf8_lossy(&out.stdout).trim().to_string();
            RuntimeInfo {
                tool,
                version: (!version.is_empty()).then_some(version),
                available: true,
            }
        }
        _ => RuntimeInfo {
            tool,
            version: None,
            available: false,
        },
    }
}

/// Check every tool. Advisory only: a missing tool never fails generation.
pub fn check_tools() -> Vec<RuntimeInfo> {
    Tool::ALL.iter().map(|t| check_tool(*t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_tools_reports_every_tool() {
        let report = check_tools();
        let tools: Vec<Tool> = report.iter().map(|r| r.tool).collect();
        assert_eq!(tools, Tool::ALL.to_vec());
    }

    #[test]
    fn test_describe_missing_tool_includes_hint() {
        let info = RuntimeInfo {
            tool: Tool::Bower,
            version: None,
            available: false,
        };
        assert!(info.describe().contains("npm install -g bower"));
    }

    #[test]
    fn test_describe_available_tool() {
        let info = RuntimeInfo {
            tool: Tool::Node,
            version: Some("v20.11.0".to_string()),
            available: true,
        };
        assert_eq!(info.describe(), "Node.js (v20.11.0)");
    }
}
