//! members-sync and actives-sync

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use dirsync_connector_gsuite::{ClientSecrets, DirectoryClient, TokenCache, TokenStore};
use dirsync_connector_myaegee::{MyAegeeClient, MyAegeeCredentials};
use dirsync_core::SyncMode;

use crate::cli::GlobalArgs;
use crate::config::{Config, ConfigPaths};
use crate::error::{CliError, CliResult};
use crate::output::{render, ReportContext};
use crate::pipeline;
use crate::sources::{MyAegeeSource, WorkspaceSource};

/// Explicit paths win; the config directory is only consulted for defaults.
fn resolve_paths(global: &GlobalArgs) -> CliResult<(Option<PathBuf>, PathBuf, PathBuf)> {
    match (&global.config, &global.token_file) {
        (Some(config), Some(token)) => Ok((Some(config.clone()), config.clone(), token.clone())),
        _ => {
            let paths = ConfigPaths::new()?;
            Ok((
                global.config.clone(),
                global.config.clone().unwrap_or(paths.config_file),
                global.token_file.clone().unwrap_or(paths.token_file),
            ))
        }
    }
}

fn load_config(explicit: Option<&Path>, path: &Path) -> CliResult<Config> {
    match explicit {
        Some(path) => Config::load(path),
        None => Config::load_or_default(path),
    }
}

fn registry_credentials(global: &GlobalArgs) -> CliResult<MyAegeeCredentials> {
    let username = global
        .myaegee_user
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| {
            CliError::Config("MyAEGEE username required (--myaegee-user or MYAEGEE_USER)".to_string())
        })?;
    let password = global.myaegee_pass.as_deref().ok_or_else(|| {
        CliError::Config("MyAEGEE password required (--myaegee-pass or MYAEGEE_PASS)".to_string())
    })?;
    Ok(MyAegeeCredentials::new(username, password))
}

fn directory_client(config: &Config, credentials_file: &Path, token_file: PathBuf) -> CliResult<DirectoryClient> {
    let mut secrets = ClientSecrets::from_file(credentials_file)?;
    if let Some(auth_uri) = &config.directory.auth_uri {
        secrets.auth_uri = auth_uri.clone();
    }
    if let Some(token_uri) = &config.directory.token_uri {
        secrets.token_uri = token_uri.clone();
    }

    debug!(token_file = %token_file.display(), "Using token cache");
    let tokens = Arc::new(TokenCache::new(secrets, Some(TokenStore::new(token_file))));
    Ok(DirectoryClient::new(
        tokens,
        &config.directory.api_base,
        Duration::from_secs(config.directory.timeout_secs),
    )?
    .with_page_size(config.directory.page_size))
}

/// Run one sync mode and write the report to `out`.
pub async fn execute<W: Write>(global: &GlobalArgs, mode: SyncMode, out: &mut W) -> CliResult<()> {
    let (explicit_config, config_path, token_file) = resolve_paths(global)?;
    let config = load_config(explicit_config.as_deref(), &config_path)?;

    let credentials = registry_credentials(global)?;
    let registry = MyAegeeSource::new(MyAegeeClient::new(&config.myaegee, credentials)?, global.body_id);
    let directory = WorkspaceSource::new(
        directory_client(&config, &global.credentials_file, token_file)?,
        config.directory.customer.clone(),
        config.directory.domain.clone(),
    );

    let result = pipeline::run(mode, &config, &registry, &directory).await?;

    let context = ReportContext::new(pipeline::directory_label(mode, &config));
    render(&result, global.output, &context, out)?;
    out.flush()?;
    Ok(())
}
