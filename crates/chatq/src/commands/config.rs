use async_trait::async_trait;
use eyre::Result;
use std::io::Write;
use std::path::PathBuf;

use super::Command;
use crate::error::Error;
use chatq_core::config::ClientConfig;

pub enum ConfigAction {
    Show,
    Init { force: bool },
}

pub struct ConfigCommand {
    pub action: ConfigAction,
    /// The settings in effect: file, environment and flags combined.
    pub effective: ClientConfig,
    /// Overrides the default config location.
    pub path: Option<PathBuf>,
}

#[async_trait]
impl Command for ConfigCommand {
    async fn execute(&self) -> Result<()> {
        match &self.action {
            ConfigAction::Show => self.show().map_err(Into::into),
            ConfigAction::Init { force } => self.init(*force).map_err(Into::into),
        }
    }
}

impl ConfigCommand {
    fn path(&self) -> std::result::Result<PathBuf, Error> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => Ok(ClientConfig::config_path()?),
        }
    }

    fn show(&self) -> std::result::Result<(), Error> {
        let path = self.path()?;
        let mut stdout = std::io::stdout();
        let status = if path.exists() { "" } else { " (not created)" };
        writeln!(stdout, "Config file: {}{status}", path.display())?;
        writeln!(stdout, "\n{}", toml::to_string_pretty(&self.effective)?)?;
        Ok(())
    }

    fn init(&self, force: bool) -> std::result::Result<(), Error> {
        let path = self.path()?;
        let mut stdout = std::io::stdout();
        if path.exists() && !force {
            writeln!(
                stdout,
                "Config file already exists at {}; use --force to overwrite.",
                path.display()
            )?;
            return Ok(());
        }

        self.effective.save_to(&path)?;
        writeln!(stdout, "Wrote {}", path.display())?;
        Ok(())
    }
}
