//! Front-end toolchain detection and dependency installation
//!
//! This module provides:
//! - Detection of the Node.js, npm and Bower executables a generated project uses
//! - Running `npm install` / `bower install` inside a new project

pub mod check;
pub mod tool;

pub use check::{check_tools, RuntimeInfo, Tool};
pub use tool::{install_dependencies, InstallStep};
