use std::path::Path;

use anyhow::{bail, Context};
use serde::{de::DeserializeOwned, Serialize};
use xshell::Shell;

/// Marker for types stored as standalone config files.
pub trait FileConfigTrait {}

pub trait ReadConfig: Sized {
    fn read(shell: &Shell, path: impl AsRef<Path>) -> anyhow::Result<Self>;
}

pub trait SaveConfig {
    fn save(&self, shell: &Shell, path: impl AsRef<Path>) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Yaml,
    Json,
}

fn format_of(path: &Path) -> anyhow::Result<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => Ok(Format::Yaml),
        Some("json") => Ok(Format::Json),
        _ => bail!("Unsupported config file extension: {}", path.display()),
    }
}

impl<T> ReadConfig for T
where
    T: DeserializeOwned + FileConfigTrait,
{
    fn read(shell: &Shell, path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = shell.current_dir().join(path);
        let content = shell
            .read_file(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = match format_of(&path)? {
            Format::Yaml => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML in {}", path.display()))?,
            Format::Json => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON in {}", path.display()))?,
        };
        Ok(config)
    }
}

impl<T> SaveConfig for T
where
    T: Serialize + FileConfigTrait,
{
    fn save(&self, shell: &Shell, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = shell.current_dir().join(path);
        let content = match format_of(&path)? {
            Format::Yaml => serde_yaml::to_string(self)?,
            Format::Json => serde_json::to_string_pretty(self)?,
        };
        if let Some(parent) = path.parent() {
            shell.create_dir(parent)?;
        }
        shell
            .write_file(&path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }
}
