use std::path::PathBuf;

use serde::Deserialize;
use tracing::debug;

use crate::command::exec;
use crate::error::{Error, Result};

/// One endpoint as reported by the agent's endpoint listing.
///
/// Every level is optional: records missing any of them are tolerated at
/// parse time and dropped when the inventory is built.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Endpoint {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub status: Option<EndpointStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndpointStatus {
    #[serde(default)]
    pub networking: Option<EndpointNetworking>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndpointNetworking {
    #[serde(default)]
    pub addressing: Vec<AddressPair>,
    #[serde(default, rename = "interface-name")]
    pub interface_name: String,
}

/// IPv4/IPv6 address pair assigned to an endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressPair {
    #[serde(default)]
    pub ipv4: Option<String>,
    #[serde(default)]
    pub ipv6: Option<String>,
}

/// Source of endpoint records for the managed inventory.
pub trait EndpointSource {
    /// Fetch the current endpoint list. Any failure is fatal to the run.
    fn endpoints(&self) -> Result<Vec<Endpoint>>;
}

/// Lists endpoints through the agent CLI (`<bin> endpoint list -o json`).
#[derive(Debug, Clone)]
pub struct CiliumCli {
    binary: String,
}

impl CiliumCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl EndpointSource for CiliumCli {
    fn endpoints(&self) -> Result<Vec<Endpoint>> {
        debug!(binary = %self.binary, "fetching endpoints");
        let output = exec(&self.binary, &["endpoint", "list", "-o", "json"])
            .map_err(|e| Error::InventoryUnavailable(e.to_string()))?;
        parse_endpoints(&output)
    }
}

/// Reads a JSON endpoint snapshot from disk.
#[derive(Debug, Clone)]
pub struct EndpointFile {
    path: PathBuf,
}

impl EndpointFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl EndpointSource for EndpointFile {
    fn endpoints(&self) -> Result<Vec<Endpoint>> {
        debug!(path = %self.path.display(), "reading endpoints");
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            Error::InventoryUnavailable(format!("read {}: {e}", self.path.display()))
        })?;
        parse_endpoints(&content)
    }
}

fn parse_endpoints(json: &str) -> Result<Vec<Endpoint>> {
    serde_json::from_str(json)
        .map_err(|e| Error::InventoryUnavailable(format!("parse endpoint list: {e}")))
}
