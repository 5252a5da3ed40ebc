use std::path::{Path, PathBuf};

use netns_mtu::{ETHERNET_MTU, PROC_ROOT, TUNNEL_OVERHEAD};
use serde::Deserialize;

use crate::error::{UpdateError, UpdateResult};
use crate::lock::DEFAULT_LOCK_FILE;

pub(crate) const DEFAULT_CILIUM_BIN: &str = "cilium";

/// Optional YAML configuration. Every field falls back to the built-in
/// default when absent.
#[derive(Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub mtu: Option<u32>,
    pub tunnel_overhead: Option<u32>,
    pub proc_root: Option<PathBuf>,
    pub lock_file: Option<PathBuf>,
    pub endpoints: EndpointsConfig,
}

#[derive(Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EndpointsConfig {
    pub cilium_bin: Option<String>,
    pub file: Option<PathBuf>,
}

/// Values given on the command line or through the environment.
#[derive(Debug, Default)]
pub struct Overrides {
    pub mtu: Option<u32>,
    pub tunnel_overhead: Option<u32>,
    pub proc_root: Option<PathBuf>,
    pub lock_file: Option<PathBuf>,
    pub cilium_bin: Option<String>,
    pub endpoints_file: Option<PathBuf>,
}

/// Where the managed endpoint inventory comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inventory {
    Cilium(String),
    File(PathBuf),
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub mtu: u32,
    pub tunnel_overhead: u32,
    pub proc_root: PathBuf,
    pub lock_file: PathBuf,
    pub inventory: Inventory,
}

/// Load a YAML config file.
///
/// Relative paths in the config are resolved against the config file's parent directory.
pub fn load(path: &Path) -> UpdateResult<FileConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| UpdateError::Config(format!("read {}: {e}", path.display())))?;
    let mut config: FileConfig = serde_yaml_ng::from_str(&content)
        .map_err(|e| UpdateError::Config(format!("parse {}: {e}", path.display())))?;
    if let Some(config_dir) = path.parent() {
        config.resolve_relative_paths(config_dir);
    }
    Ok(config)
}

impl FileConfig {
    fn resolve_relative_paths(&mut self, config_dir: &Path) {
        let resolve = |p: &mut Option<PathBuf>| {
            if let Some(p) = p
                && p.is_relative()
            {
                *p = config_dir.join(&*p);
            }
        };
        resolve(&mut self.proc_root);
        resolve(&mut self.lock_file);
        resolve(&mut self.endpoints.file);
    }
}

/// Merge command-line overrides over the file config over built-in defaults.
///
/// An endpoints file from either layer wins over the agent CLI, unless the
/// command line names the agent binary explicitly.
pub fn resolve(overrides: Overrides, file: FileConfig) -> Settings {
    let inventory = match (overrides.endpoints_file, overrides.cilium_bin) {
        (Some(path), _) => Inventory::File(path),
        (None, Some(bin)) => Inventory::Cilium(bin),
        (None, None) => match (file.endpoints.file, file.endpoints.cilium_bin) {
            (Some(path), _) => Inventory::File(path),
            (None, bin) => Inventory::Cilium(bin.unwrap_or_else(|| DEFAULT_CILIUM_BIN.to_string())),
        },
    };

    Settings {
        mtu: overrides.mtu.or(file.mtu).unwrap_or(ETHERNET_MTU),
        tunnel_overhead: overrides
            .tunnel_overhead
            .or(file.tunnel_overhead)
            .unwrap_or(TUNNEL_OVERHEAD),
        proc_root: overrides
            .proc_root
            .or(file.proc_root)
            .unwrap_or_else(|| PathBuf::from(PROC_ROOT)),
        lock_file: overrides
            .lock_file
            .or(file.lock_file)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCK_FILE)),
        inventory,
    }
}
