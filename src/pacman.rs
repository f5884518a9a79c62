//! Mirror list and pacman.conf handling.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Mirror URLs grouped by region, in preference order
    pub regions: BTreeMap<String, Vec<String>>,
}

impl MirrorConfig {
    pub fn is_empty(&self) -> bool {
        self.regions.values().all(Vec::is_empty)
    }

    pub fn to_mirrorlist(&self) -> String {
        let mut output = String::from("# Generated by arch-provision\n");
        for (region, servers) in &self.regions {
            output.push_str(&format!("\n## {}\n", region));
            for server in servers {
                output.push_str(&format!("Server = {}\n", server));
            }
        }
        output
    }
}

/// The optional repositories to enable for the given switches
pub fn optional_repositories(testing: bool, multilib: bool) -> Vec<&'static str> {
    let mut repositories = Vec::new();
    if testing {
        repositories.extend(["core-testing", "extra-testing"]);
    }
    if multilib {
        repositories.push("multilib");
        if testing {
            repositories.push("multilib-testing");
        }
    }
    repositories
}

/// Uncomments the section header and the Include line of each repository in `repositories`
pub fn enable_repositories(pacman_conf: &str, repositories: &[&str]) -> String {
    let mut output = String::with_capacity(pacman_conf.len());
    let mut in_enabled_section = false;

    for line in pacman_conf.lines() {
        let trimmed = line.trim();
        let header = trimmed
            .strip_prefix("#[")
            .and_then(|rest| rest.strip_suffix(']'));

        if let Some(name) = header {
            in_enabled_section = repositories.contains(&name);
            if in_enabled_section {
                output.push_str(&format!("[{}]\n", name));
                continue;
            }
        } else if trimmed.starts_with('[') {
            in_enabled_section = false;
        } else if in_enabled_section && trimmed.starts_with("#Include") {
            output.push_str(&trimmed[1..]);
            output.push('\n');
            continue;
        }

        output.push_str(line);
        output.push('\n');
    }

    output
}
