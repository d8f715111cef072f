//! Version comparison for CLI and template pack compatibility

use semver::Version;

/// Compare CLI version against the pack version.
/// Returns a warning message if the CLI is older than the pack expects
pub fn check_compatibility(
    cli_version: &str,
    pack_version: &str,
    upgrade_command: &str,
) -> Option<String> {
    let cli_ver = parse_version(cli_version)?;
    let pack_ver = parse_version(pack_version)?;

    (cli_ver < pack_ver).then(|| {
        format!(
            "Warning: This template pack was designed for CLI version {} or newer.\n\
             You are running version {}.\n\
             Consider updating: {}",
            pack_version, cli_version, upgrade_command
        )
    })
}

/// Parse version string, tolerating a leading 'v'
fn parse_version(version_str: &str) -> Option<Version> {
    let cleaned = version_str.strip_prefix('v').unwrap_or(version_str);
    Version::parse(cleaned).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_older_than_pack() {
        let warning = check_compatibility("0.1.0", "0.2.0", "cargo install plump-cli --force");
        assert!(warning.unwrap().contains("0.2.0"));
    }

    #[test]
    fn test_cli_same_or_newer() {
        assert!(check_compatibility("0.2.0", "0.2.0", "x").is_none());
        assert!(check_compatibility("0.3.0", "v0.2.0", "x").is_none());
    }

    #[test]
    fn test_invalid_versions() {
        // Can't compare, no warning
        assert!(check_compatibility("invalid", "0.1.0", "x").is_none());
    }
}
