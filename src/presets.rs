use crate::error::ErrorKind;
use crate::plan::{InstallConfig, PostInstallCommand};
use anyhow::Context;
use log::debug;
use serde::Deserialize;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Preset {
    packages: Option<Vec<String>>,
    services: Option<Vec<String>>,
    script: Option<String>,
    /// Runs the script as this user instead of root
    run_as: Option<String>,
    environment_variables: Option<Vec<String>>,
}

fn visit_dirs(dir: &Path, filevec: &mut Vec<PathBuf>) -> Result<(), io::Error> {
    if dir.is_dir() {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                visit_dirs(&path, filevec)?;
            } else if path.extension() == Some(std::ffi::OsStr::new("toml")) {
                filevec.push(path);
            }
        }
    }
    Ok(())
}

impl Preset {
    fn load(path: &Path) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| ErrorKind::Preset(format!("{}", path.display())))?;
        Ok(toml::from_str(&data)
            .with_context(|| ErrorKind::Preset(format!("{}", path.display())))?)
    }

    fn process(self, collection: &mut PresetsCollection, environment_variables: &mut Vec<String>) {
        if let Some(packages) = self.packages {
            collection.packages.extend(packages);
        }

        if let Some(services) = self.services {
            collection.services.extend(services);
        }

        if let Some(variables) = self.environment_variables {
            environment_variables.extend(variables);
        }

        if let Some(script) = self.script {
            collection.commands.push(PostInstallCommand {
                command: script,
                user: self.run_as,
            });
        }
    }
}

#[derive(Debug, Default)]
pub struct PresetsCollection {
    pub packages: Vec<String>,
    pub services: Vec<String>,
    pub commands: Vec<PostInstallCommand>,
}

impl PresetsCollection {
    pub fn load(list: &[PathBuf]) -> anyhow::Result<Self> {
        let mut collection = Self::default();
        let mut environment_variables = Vec::new();

        for preset in list {
            if preset.is_dir() {
                // Build vector of paths to files, then sort by path name
                // Recursively load directories of preset files
                let mut dir_paths: Vec<PathBuf> = Vec::new();
                visit_dirs(preset, &mut dir_paths)
                    .with_context(|| ErrorKind::Preset(format!("{}", preset.display())))?;

                // Order not guaranteed so we sort
                dir_paths.sort();

                for path in dir_paths {
                    debug!("Loading preset {}", path.display());
                    Preset::load(&path)?.process(&mut collection, &mut environment_variables);
                }
            } else {
                debug!("Loading preset {}", preset.display());
                Preset::load(preset)?.process(&mut collection, &mut environment_variables);
            }
        }

        let mut missing_environments: Vec<String> = environment_variables
            .into_iter()
            .filter(|var| env::var(var).is_err())
            .collect();
        missing_environments.sort();
        missing_environments.dedup();

        if !missing_environments.is_empty() {
            return Err(ErrorKind::MissingEnvironmentVariables(missing_environments).into());
        }

        Ok(collection)
    }

    /// Adds everything the presets ask for on top of `config`
    pub fn apply(self, config: &mut InstallConfig) {
        config.add_packages(self.packages);
        config.add_services(self.services);
        config.commands.extend(self.commands);
    }
}
