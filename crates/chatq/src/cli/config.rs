use dotenvy::dotenv;
use eyre::Result;

use super::Cli;
use chatq_core::config::ClientConfig;

pub fn load_env() -> Result<()> {
    dotenv().ok();
    Ok(())
}

/// Settings from the config file, with command-line flags on top.
pub fn resolve_client_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = ClientConfig::load()?;
    apply_cli_overrides(&mut config, cli);
    Ok(config)
}

pub fn apply_cli_overrides(config: &mut ClientConfig, cli: &Cli) {
    if let Some(base_url) = non_blank(cli.base_url.as_deref()) {
        config.base_url = base_url;
    }
    if let Some(tenant) = non_blank(cli.tenant.as_deref()) {
        config.tenant_id = tenant;
    }
    if let Some(email) = non_blank(cli.email.as_deref()) {
        config.user_email = Some(email);
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
