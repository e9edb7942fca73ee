//! Tor Browser integration: bridge installation and launch.

use crate::output::{PREFS_BRIDGE_PREFIX, prefs_fragment};
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// prefs.js of the default profile in an extracted Tor Browser bundle
pub const DEFAULT_PREFS_JS: &str = "Browser/TorBrowser/Data/Browser/profile.default/prefs.js";

/// Launchers tried in order, relative to the bundle root
const LAUNCHERS: &[(&str, &[&str])] = &[
    ("Browser/start-tor-browser", &["--detach"]),
    ("Browser/firefox.exe", &[]),
];

/// Replace the bridge settings in a Tor Browser `prefs.js`.
///
/// Every existing line mentioning a bridge setting is dropped and the new
/// bridge prefs are appended.
///
/// # Errors
///
/// Returns an error if the file cannot be read or written.
pub fn install_prefs(path: &Path, lines: &[String]) -> anyhow::Result<()> {
    let current = fs::read_to_string(path)
        .with_context(|| format!("Can't open Tor Browser configuration {}", path.display()))?;

    let mut updated: String = current
        .lines()
        .filter(|line| !line.contains(PREFS_BRIDGE_PREFIX))
        .flat_map(|line| [line, "\n"])
        .collect();

    for pref in prefs_fragment(lines) {
        updated.push_str(&pref);
        updated.push('\n');
    }

    fs::write(path, updated)
        .with_context(|| format!("Can't write Tor Browser configuration {}", path.display()))?;

    tracing::info!(
        "Installed {} bridges into {}",
        lines.len(),
        path.display()
    );
    Ok(())
}

/// First launcher present under `root`
#[must_use]
pub fn find_launcher(root: &Path) -> Option<(PathBuf, &'static [&'static str])> {
    LAUNCHERS
        .iter()
        .map(|(path, args)| (root.join(path), *args))
        .find(|(path, _)| path.exists())
}

/// Launch Tor Browser from the bundle at `root` without waiting for it.
///
/// Returns `false` if no launcher was found.
///
/// # Errors
///
/// Returns an error if a launcher exists but cannot be started.
pub fn start_browser(root: &Path) -> anyhow::Result<bool> {
    let Some((launcher, args)) = find_launcher(root) else {
        return Ok(false);
    };

    Command::new(&launcher)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("Can't start {}", launcher.display()))?;

    tracing::info!("Started {}", launcher.display());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_prefs_replaces_bridges() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.js");
        fs::write(
            &path,
            concat!(
                "user_pref(\"browser.startup.homepage\", \"about:tor\");\n",
                "user_pref(\"torbrowser.settings.bridges.bridge_strings.0\", \"old\");\n",
                "user_pref(\"torbrowser.settings.bridges.enabled\", false);\n",
                "user_pref(\"extensions.torlauncher.prompt_at_startup\", false);\n",
            ),
        )
        .unwrap();

        let lines = vec!["192.0.2.1:443 AAAA".to_string()];
        install_prefs(&path, &lines).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let result: Vec<_> = contents.lines().collect();
        assert_eq!(
            result,
            vec![
                r#"user_pref("browser.startup.homepage", "about:tor");"#,
                r#"user_pref("extensions.torlauncher.prompt_at_startup", false);"#,
                r#"user_pref("torbrowser.settings.bridges.bridge_strings.0", "192.0.2.1:443 AAAA");"#,
                r#"user_pref("torbrowser.settings.bridges.enabled", true);"#,
                r#"user_pref("torbrowser.settings.bridges.source", 2);"#,
            ]
        );
        assert!(!contents.contains("old"));
    }

    #[test]
    fn test_install_prefs_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = install_prefs(&dir.path().join("prefs.js"), &["x".to_string()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_no_launcher() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_launcher(dir.path()).is_none());
        assert!(!start_browser(dir.path()).unwrap());
    }

    #[test]
    fn test_find_launcher_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Browser")).unwrap();
        fs::write(dir.path().join("Browser/firefox.exe"), b"").unwrap();

        let (path, args) = find_launcher(dir.path()).unwrap();
        assert!(path.ends_with("Browser/firefox.exe"));
        assert!(args.is_empty());

        fs::write(dir.path().join("Browser/start-tor-browser"), b"").unwrap();
        let (path, args) = find_launcher(dir.path()).unwrap();
        assert!(path.ends_with("Browser/start-tor-browser"));
        assert_eq!(args, &["--detach"]);
    }
}
