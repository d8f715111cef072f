//! Product configuration trait for CLI binaries
//!
//! The generator flow is parameterized by this trait so the binary decides
//! identity, template sources and the closing instructions.

use std::path::Path;

/// Configuration trait for the CLI product
///
/// The binary implements this trait to define:
/// - Product identity (name, display name)
/// - Template pack override URL
/// - Documentation links
/// - Post-setup instructions
pub trait ProductConfig: Clone + Send + Sync + 'static {
    /// Internal product name (used for CLI command, env vars)
    fn name(&self) -> &'static str;

    /// Human-readable display name
    fn display_name(&self) -> &'static str;

    /// Environment variable name for fetching the template pack from a URL
    fn template_url_env(&self) -> &'static str;

    /// URL for product documentation
    fn docs_url(&self) -> &'static str;

    /// Generate the "next steps" instructions after project creation
    fn next_steps(&self, dir: &Path, dependencies_installed: bool) -> Vec<String>;

    /// CLI description shown in help text
    fn cli_description(&self) -> &'static str;

    /// Upgrade/install command shown in version warnings
    fn upgrade_command(&self) -> &'static str;

    /// User agent string for HTTP requests
    fn user_agent(&self) -> &'static str {
        self.name()
    }
}
