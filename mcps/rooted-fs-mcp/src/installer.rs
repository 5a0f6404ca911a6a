//! Host registration
//!
//! Writes an `mcpServers.<name>` entry with this binary's launch command into
//! a desktop host's JSON config, leaving every other key untouched.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde_json::{json, Map, Value};

/// File name of the host config
const HOST_CONFIG_FILE: &str = "claude_desktop_config.json";

/// What `install` should do
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Key under `mcpServers`
    pub name: String,
    /// Host config to edit; platform default when `None`
    pub config_path: Option<PathBuf>,
    /// Root passed to the server as `--root`; the host's working directory when `None`
    pub root: Option<PathBuf>,
    /// Executable to register
    pub command: PathBuf,
    /// Compute the result without writing it
    pub dry_run: bool,
}

/// What `install` did
#[derive(Debug)]
pub struct InstallReport {
    pub config_path: PathBuf,
    /// True when the config file did not exist before
    pub created: bool,
    /// True when an entry with the same name was overwritten
    pub replaced: bool,
    pub entry: Value,
}

/// Default host config location for this platform
///
/// Windows `%APPDATA%\Claude`, macOS `~/Library/Application Support/Claude`,
/// elsewhere `~/.config/claude`.
pub fn default_host_config_path() -> Option<PathBuf> {
    let config_dir = dirs::config_dir()?;
    let host_dir = if cfg!(any(target_os = "windows", target_os = "macos")) {
        "Claude"
    } else {
        "claude"
    };
    Some(config_dir.join(host_dir).join(HOST_CONFIG_FILE))
}

/// The `mcpServers` entry that launches this server
pub fn server_entry(command: &Path, root: Option<&Path>) -> Value {
    let mut args = vec![Value::from("serve")];
    if let Some(root) = root {
        args.push(Value::from("--root"));
        args.push(Value::from(root.display().to_string()));
    }

    json!({
        "command": command.display().to_string(),
        "args": args,
        "env": {},
    })
}

/// Insert `entry` under `mcpServers.<name>` in `config`
///
/// Returns whether an existing entry was replaced.
pub fn register(config: &mut Value, name: &str, entry: Value) -> Result<bool> {
    if config.is_null() {
        *config = Value::Object(Map::new());
    }
    let Some(root) = config.as_object_mut() else {
        bail!("host config is not a JSON object");
    };

    let servers = root
        .entry("mcpServers")
        .or_insert_with(|| Value::Object(Map::new()));
    let Some(servers) = servers.as_object_mut() else {
        bail!("`mcpServers` in host config is not a JSON object");
    };

    Ok(servers.insert(name.to_string(), entry).is_some())
}

/// Register the server in the host config
pub fn install(options: &InstallOptions) -> Result<InstallReport> {
    let config_path = match &options.config_path {
        Some(path) => path.clone(),
        None => default_host_config_path()
            .context("could not determine the host config directory; pass --config-path")?,
    };

    let created = !config_path.exists();
    let mut config = if created {
        Value::Null
    } else {
        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;
        if content.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", config_path.display()))?
        }
    };

    let entry = server_entry(&options.command, options.root.as_deref());
    let replaced = register(&mut config, &options.name, entry.clone())?;

    if options.dry_run {
        tracing::info!(path = %config_path.display(), "Dry run, not writing host config");
    } else {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut rendered = serde_json::to_string_pretty(&config)?;
        rendered.push('\n');
        std::fs::write(&config_path, rendered)
            .with_context(|| format!("writing {}", config_path.display()))?;
        tracing::info!(path = %config_path.display(), name = %options.name, "Registered server");
    }

    Ok(InstallReport {
        config_path,
        created,
        replaced,
        entry,
    })
}
