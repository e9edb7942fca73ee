//! Rendering of reachable relays.

use clap::ValueEnum;
use std::fmt::Write as _;

/// Pref prefix shared by every Tor Browser bridge setting
pub const PREFS_BRIDGE_PREFIX: &str = "torbrowser.settings.bridges.";

/// Output format for reachable relays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// `<ip:port> <FINGERPRINT>` per line
    #[default]
    Plain,
    /// torrc `Bridge` lines followed by `UseBridges 1`
    Torrc,
    /// Tor Browser `prefs.js` fragment
    PrefsJs,
}

/// `user_pref` lines enabling the given bridges in Tor Browser
#[must_use]
pub fn prefs_fragment(lines: &[String]) -> Vec<String> {
    let mut prefs: Vec<String> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            format!("user_pref(\"{PREFS_BRIDGE_PREFIX}bridge_strings.{i}\", \"{line}\");")
        })
        .collect();
    prefs.push(format!("user_pref(\"{PREFS_BRIDGE_PREFIX}enabled\", true);"));
    prefs.push(format!("user_pref(\"{PREFS_BRIDGE_PREFIX}source\", 2);"));
    prefs
}

/// Render bridge lines in the requested format.
///
/// An empty input renders as an empty string in every format.
#[must_use]
pub fn render(format: OutputFormat, lines: &[String]) -> String {
    if lines.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    match format {
        OutputFormat::Plain => {
            for line in lines {
                let _ = writeln!(out, "{line}");
            }
        }
        OutputFormat::Torrc => {
            for line in lines {
                let _ = writeln!(out, "Bridge {line}");
            }
            out.push_str("UseBridges 1\n");
        }
        OutputFormat::PrefsJs => {
            for pref in prefs_fragment(lines) {
                let _ = writeln!(out, "{pref}");
            }
        }
    }
    out
}
