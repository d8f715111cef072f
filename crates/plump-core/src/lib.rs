//! Plump Core - Shared library for the Plump front-end generator
//!
//! This library provides two halves of the `plump` tool:
//!
//! - **Generator**: renders the embedded (or local/remote) template pack into a
//!   new project directory, parameterized by the modules the user selected from
//!   the module catalog.
//! - **Task runner**: the fixed set of build tasks a generated project uses
//!   (`styles`, `scripts`, `templates`, `images`, `fonts`, `copy`, `build`,
//!   `watch`, `serve`, `develop`, `stage`, ...), configured by the project's
//!   `plump-config.json`.
//!
//! # Architecture
//!
//! - **Layer 1: Data** - `Catalog`, `Answers`, `Settings` (plain serde types)
//! - **Layer 2: Operations** - template pack loading, project generation, tasks
//! - **Layer 3: CLI/TUI Interface** - Optional cliclack-based prompts (feature-gated)
//!
//! # Feature Flags
//!
//! - `tui` (default): Enables the cliclack-based TUI prompts module
//!
//! # Example Usage (without TUI)
//!
//! ```ignore
//! use plump_core::{Answers, TemplatePack, PackSource, generate};
//!
//! let pack = TemplatePack::load(&PackSource::Embedded, "plump").await?;
//! let mut answers = Answers::new("my-site");
//! answers.select("inuit", ["defaults", "box-sizing"]);
//! answers.validate(&pack.catalog)?;
//! let written = generate(&pack, &answers, "my-site".as_ref()).await?;
//! ```

pub mod answers;
pub mod build;
pub mod catalog;
pub mod product;
pub mod runtime;
pub mod templates;

#[cfg(feature = "tui")]
pub mod tui;

// Re-export main types for convenience
pub use answers::{AnswerError, Answers};
pub use build::{run_task, RunOptions, Settings, TaskName};
pub use catalog::{Catalog, CatalogError, Group};
pub use product::ProductConfig;
pub use templates::{generate, PackManifest, PackSource, TemplatePack};

#[cfg(feature = "tui")]
pub use tui::run;
