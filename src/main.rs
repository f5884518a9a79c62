mod args;
mod aur;
mod bootloader;
mod chassis;
mod constants;
mod engine;
mod error;
mod initcpio;
mod layout;
mod orchestrator;
mod pacman;
mod plan;
mod presets;
mod process;
mod profiles;
mod prompt;
mod storage;
mod tool;

use anyhow::Context;
use args::{App, Command, InstallCommand, PlanCommand};
use chassis::ChassisType;
use engine::ArchEngine;
use error::ErrorKind;
use layout::{DeviceInfo, DiskLayout, Size};
use log::{error, info, warn};
use plan::{validate_hostname, InstallConfig, InstallPlan, Password, Secrets};
use presets::PresetsCollection;
use prompt::{Prompt, Terminal};
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use std::fs;
use std::path::PathBuf;
use std::process::exit;
use structopt::StructOpt;

/// Layers the presets on top of a profile
fn with_presets(mut config: InstallConfig, presets: &[PathBuf]) -> anyhow::Result<InstallConfig> {
    PresetsCollection::load(presets)?.apply(&mut config);
    Ok(config)
}

/// Takes every answer from the command line, asking for whatever is missing
fn gather_secrets(
    command: &InstallCommand,
    username: &str,
    encrypt: bool,
    prompt: &mut dyn Prompt,
) -> anyhow::Result<Secrets> {
    let hostname = match &command.hostname {
        Some(hostname) => {
            validate_hostname(hostname)?;
            hostname.clone()
        }
        None => prompt::hostname(prompt)?,
    };

    let user_password = match &command.user_password {
        Some(password) => Password::new(password.as_str()),
        None => prompt::confirmed_password(prompt, &format!("the password for {}", username))?,
    };

    let disk_password = if !encrypt {
        None
    } else {
        Some(match &command.disk_password {
            Some(password) => Password::new(password.as_str()),
            None => prompt::confirmed_password(prompt, "the disk encryption password")?,
        })
    };

    Ok(Secrets {
        hostname,
        user_password,
        disk_password,
    })
}

/// Resolves the profile, the overrides and every answer into a plan. Nothing touches the
/// disk until this succeeds.
fn prepare_plan(
    command: &InstallCommand,
    prompt: &mut dyn Prompt,
    chassis: ChassisType,
) -> anyhow::Result<InstallPlan> {
    let config = profiles::load_for(&command.profile, &command.username, &command.aur_helper)?;
    let mut config = with_presets(config, &command.presets)?;
    if let Some(device) = &command.device {
        config.device = device.clone();
    }
    if command.no_encryption {
        warn!("The root partition will not be encrypted");
        config.encrypt = false;
    }
    config.add_packages(command.extra_packages.iter().cloned());

    let secrets = gather_secrets(command, &config.username, config.encrypt, prompt)?;
    info!("Chassis: {:?}", chassis);
    Ok(InstallPlan::new(config, secrets, chassis)?)
}

fn install(command: InstallCommand) -> anyhow::Result<()> {
    let plan = prepare_plan(&command, &mut Terminal, ChassisType::detect())?;

    let staging = tempfile::Builder::new()
        .prefix("arch-provision")
        .tempdir()
        .context(ErrorKind::TmpDirError)?
        .keep();

    let mut engine = ArchEngine::new()?;
    let result = orchestrator::provision(&mut engine, &plan, &staging);
    let finished = engine.finish();
    result?;
    finished?;

    fs::remove_dir(&staging).context(ErrorKind::TmpDirError)?;
    Ok(())
}

fn plan(command: PlanCommand) -> anyhow::Result<()> {
    let config = with_presets(profiles::load(&command.profile)?, &command.presets)?;
    let total_size = u64::try_from(command.device_size.get_bytes())
        .map_err(|_| ErrorKind::InvalidLayout("the device size is too large".into()))?;

    let device = DeviceInfo {
        path: config.device.clone(),
        total_size: Size::from_bytes(total_size),
        sector_size: 512,
    };
    let layout = DiskLayout::standard(&device, &config.layout)?;

    println!("{}", toml::to_string(&config)?);
    print!("{}", layout);
    Ok(())
}

fn list_profiles() {
    for (name, description) in profiles::PROFILES.iter() {
        let default = if *name == profiles::DEFAULT_PROFILE {
            " (default)"
        } else {
            ""
        };
        println!("{}{}: {}", name, default, description);
    }
}

fn main() {
    let app = App::from_args();

    let log_level = if app.verbose {
        LevelFilter::Trace
    } else {
        LevelFilter::Info
    };

    let log_config = ConfigBuilder::new()
        .add_filter_allow_str("arch_provision")
        .build();
    if let Err(e) = TermLogger::init(log_level, log_config, TerminalMode::Mixed, ColorChoice::Auto) {
        eprintln!("Unable to initialize the logger: {}", e);
    }

    let result = match app.cmd {
        Command::Install(command) => install(command),
        Command::Plan(command) => plan(command),
        Command::Profiles => {
            list_profiles();
            Ok(())
        }
    };

    match result {
        Ok(()) => {
            exit(0);
        }
        Err(error) => {
            error!("{}", error);
            for cause in error.chain().skip(1) {
                error!("Caused by: {}", cause);
            }
            exit(1);
        }
    }
}
