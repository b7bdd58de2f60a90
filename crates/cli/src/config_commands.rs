use std::path::{Path, PathBuf};

use {clap::Subcommand, folio_config::FolioConfig};

#[derive(Subcommand, Default)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML (secrets masked).
    #[default]
    Show,
    /// Print the config file that would be loaded.
    Path,
    /// Check the effective configuration and exit non-zero if it is invalid.
    Check,
}

pub fn handle_config(
    action: ConfigAction,
    config: &FolioConfig,
    explicit: Option<&Path>,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            print!("{}", render_toml(config)?);
        },
        ConfigAction::Path => match resolve_path(explicit) {
            Some(path) => println!("{}", path.display()),
            None => println!("(none, using defaults)"),
        },
        ConfigAction::Check => {
            config.validate()?;
            println!("configuration ok");
        },
    }
    Ok(())
}

fn render_toml(config: &FolioConfig) -> anyhow::Result<String> {
    Ok(toml::to_string_pretty(&config.redacted())?)
}

fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(folio_config::find_config_file)
}
