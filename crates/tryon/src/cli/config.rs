//! The `tryon config` command: inspect and initialize configuration.

use clap::{Args, Subcommand};
use tryon_core::config::{ReplicateConfig, OVERRIDE_KEYS};
use tryon_core::Config;

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display the effective configuration (file plus environment overrides)
    Show,

    /// Show config file path
    Path,

    /// Initialize a new config file with defaults
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

/// Execute the config command.
pub async fn execute(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let config = Config::load()?;
            for line in summary(&config, |key| std::env::var(key).ok()) {
                eprintln!("{line}");
            }
            println!("{}", config.to_toml()?);
        }

        ConfigCommand::Path => {
            println!("{}", Config::default_path().display());
        }

        ConfigCommand::Init { force } => {
            let path = Config::default_path();
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at: {}\nUse --force to overwrite.",
                    path.display()
                );
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, template()?)?;

            tracing::info!("Config file created at: {}", path.display());
            println!("Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

/// Defaults with every optional table filled in, so the file lists all knobs.
fn template() -> anyhow::Result<String> {
    let mut config = Config::default();
    config.provider.replicate = Some(ReplicateConfig::default());
    Ok(config.to_toml()?)
}

/// How the loaded config resolves: backend, demo gate, active overrides.
fn summary<F>(config: &Config, lookup: F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let gate = if config.demo.enabled {
        "demo (enabled by flag)"
    } else if config.provider_api_key().is_none() {
        "demo (no credentials for this backend)"
    } else {
        "live"
    };

    let overrides: Vec<&str> = OVERRIDE_KEYS
        .iter()
        .copied()
        .filter(|key| lookup(key).is_some_and(|v| !v.is_empty()))
        .collect();

    vec![
        format!("# backend:   {}", config.provider.backend),
        format!("# mode:      {gate}"),
        format!(
            "# vision:    {}",
            if config.vision.enabled {
                config.vision.provider.as_str()
            } else {
                "disabled"
            }
        ),
        format!(
            "# overrides: {}",
            if overrides.is_empty() {
                "none".to_string()
            } else {
                overrides.join(", ")
            }
        ),
    ]
}
