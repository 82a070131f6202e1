//! Settings view and validation commands: `isofilter config`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::super::ConfigCommands;

fn settings_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => isofilter::settings::Settings::default_path()
            .context("No configuration directory on this platform; pass --config"),
    }
}

pub fn cmd_config(explicit: Option<&Path>, command: Option<ConfigCommands>) -> Result<()> {
    use isofilter::settings::{SORT_CMD_ENV, Settings, TMPDIR_ENV};

    let path = settings_path(explicit)?;

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("isofilter settings");
            println!("==================");
            println!();

            let settings = if path.exists() {
                println!("Settings file: {}", path.display());
                Settings::load(&path)?
            } else {
                println!("No settings file at {}; using defaults.", path.display());
                Settings::default()
            };
            println!();

            println!("[oracle]");
            if let Some(command) = &settings.oracle.command {
                println!("  command = \"{}\"", command);
            }
            if let Some(dir) = &settings.oracle.temp_dir {
                println!("  temp_dir = \"{}\"", dir.display());
            }
            if let Some(size) = &settings.oracle.buffer_size {
                println!("  buffer_size = \"{}\"", size);
            }
            println!();
            println!("[canon]");
            println!("  mode = \"{}\"", settings.canon.mode);
            println!("  max_vertices = {}", settings.canon.max_vertices);
            println!();

            println!("Effective values (with {} / {}):", SORT_CMD_ENV, TMPDIR_ENV);
            println!("  sort command = \"{}\"", settings.sort_command());
            match settings.temp_dir() {
                Some(dir) => println!("  temp dir = \"{}\"", dir.display()),
                None => println!("  temp dir = (sort default)"),
            }
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating settings...");
            println!();

            if !path.exists() {
                println!("No settings file found. Using defaults (valid).");
                return Ok(());
            }

            let settings = Settings::load(&path)?;
            let warnings = settings.validate();

            if warnings.is_empty() {
                println!("Settings are valid.");
            } else {
                println!("Settings warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if path.exists() {
                println!("Settings file already exists at {}", path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            Settings::default().save(&path)?;

            println!("Created {}", path.display());
            println!();
            println!("You can now customize:");
            println!("  - [oracle] command, temp_dir, buffer_size");
            println!("  - [canon] mode, max_vertices");
            println!();
        }
    }

    Ok(())
}
