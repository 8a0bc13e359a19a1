use clap::{Parser, Subcommand};

/// DataForge — a conversational dataset-configuration gateway.
#[derive(Debug, Parser)]
#[command(name = "dataforge", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the gateway server (default when no subcommand is given).
    Serve,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

/// Load configuration from `DF_CONFIG` (default `dataforge.toml`).
/// A missing file resolves to defaults so a bare checkout still boots.
pub fn load_config() -> anyhow::Result<(df_domain::config::Config, String)> {
    let config_path = std::env::var("DF_CONFIG").unwrap_or_else(|_| "dataforge.toml".into());

    let path = std::path::Path::new(&config_path);
    let config = if path.exists() {
        df_domain::config::Config::load(path)
            .map_err(|e| anyhow::anyhow!("loading {config_path}: {e}"))?
    } else {
        df_domain::config::Config::default()
    };

    Ok((config, config_path))
}

/// `config validate`: print every issue, return false on any error.
pub fn validate(config: &df_domain::config::Config, config_path: &str) -> bool {
    let issues = config.validate();
    if issues.is_empty() {
        println!("{config_path}: OK");
        return true;
    }
    for issue in &issues {
        println!("{issue}");
    }
    !issues
        .iter()
        .any(|i| i.severity == df_domain::config::ConfigSeverity::Error)
}

/// `config show`: dump the resolved config as TOML.
pub fn show(config: &df_domain::config::Config) {
    match toml::to_string_pretty(config) {
        Ok(rendered) => println!("{rendered}"),
        Err(e) => eprintln!("failed to render config: {e}"),
    }
}
