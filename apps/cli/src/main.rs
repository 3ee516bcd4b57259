use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sdwire_core::{DeviceRegistry, DeviceSelector, NusbBus, SwitchMode};
use serde::Deserialize;
use tracing::{debug, error};

#[derive(Parser, Debug)]
#[command(author, version, about = "SDWire SD-card multiplexer control", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Select the board by serial number
    #[arg(long, global = true)]
    serial: Option<String>,

    /// Select the board by an alias from the config file
    #[arg(long, global = true, conflicts_with = "serial")]
    device: Option<String>,

    /// Path to the alias config (default: $XDG_CONFIG_HOME/sdwire/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every SDWire board on the bus
    List,
    /// Route the SD card: `target` (alias `dut`) or `host` (alias `ts`)
    Set { mode: String },
}

/// Alias table mapping rig names to device serials:
///
/// ```toml
/// [devices]
/// rig-a = "ABC123"
/// ```
#[derive(Debug, Default, Deserialize)]
struct Config {
    #[serde(default)]
    devices: HashMap<String, String>,
}

impl Config {
    /// A missing file just means an empty alias table; only unreadable or
    /// malformed files are errors.
    fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path.map(Path::to_path_buf).or_else(default_config_path) else {
            return Ok(Self::default());
        };
        if !path.exists() {
            debug!(path = %path.display(), "No config file");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
    }
}

fn default_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("sdwire").join("config.toml"))
}

impl Args {
    fn selector(&self) -> Result<DeviceSelector> {
        if let Some(serial) = &self.serial {
            return Ok(DeviceSelector::Serial(serial.clone()));
        }
        if let Some(alias) = &self.device {
            let config = Config::load(self.config.as_deref())?;
            let serial = config
                .devices
                .get(alias)
                .with_context(|| format!("device alias {alias:?} not found in config"))?;
            return Ok(DeviceSelector::Serial(serial.clone()));
        }
        Ok(DeviceSelector::FirstAvailable)
    }
}

fn main() {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(if args.verbose {
                    tracing::Level::DEBUG.into()
                } else {
                    tracing::Level::INFO.into()
                })
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(e) = run(&args) {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let registry = DeviceRegistry::new();
    match &args.command {
        Command::List => list(&registry),
        Command::Set { mode } => set(&registry, args, mode),
    }
}

fn list(registry: &DeviceRegistry<NusbBus>) -> Result<()> {
    let devices = registry.list_devices()?;
    if devices.is_empty() {
        println!("No SDWire devices found");
        return Ok(());
    }
    for device in devices {
        println!("{device}");
    }
    Ok(())
}

fn set(registry: &DeviceRegistry<NusbBus>, args: &Args, mode: &str) -> Result<()> {
    let mode: SwitchMode = mode.parse()?;
    let mut sdwire = registry.connect(&args.selector()?)?;
    sdwire.set_mode(mode)?;
    println!("{sdwire} -> {mode}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parses_alias_table() {
        let config: Config = toml::from_str(
            r#"
            [devices]
            rig-a = "ABC123"
            rig-b = "DEF456"
            "#,
        )
        .unwrap();

        assert_eq!(config.devices["rig-a"], "ABC123");
        assert_eq!(config.devices["rig-b"], "DEF456");
    }

    #[test]
    fn test_config_tolerates_empty_file() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.devices.is_empty());
    }

    #[test]
    fn test_config_rejects_malformed_table() {
        assert!(toml::from_str::<Config>("[devices]\nrig-a = 3").is_err());
    }
}
