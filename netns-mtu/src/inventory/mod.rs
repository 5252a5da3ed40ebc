//! Addresses and interfaces owned by the control plane.

mod endpoint;

use std::collections::HashSet;
use std::net::IpAddr;

use tracing::{debug, warn};

pub use endpoint::{
    AddressPair, CiliumCli, Endpoint, EndpointFile, EndpointNetworking, EndpointSource,
    EndpointStatus,
};

/// Snapshot of managed addresses and interface names.
///
/// Built once per run and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ManagedInventory {
    addresses: HashSet<IpAddr>,
    interfaces: HashSet<String>,
}

impl ManagedInventory {
    /// Build the inventory from endpoint records.
    ///
    /// Never fails: incomplete records and unparseable addresses are logged
    /// and left out, so the affected workloads are simply not managed.
    pub fn build(endpoints: &[Endpoint]) -> Self {
        let mut inventory = Self::default();

        for ep in endpoints {
            let id = ep.id.unwrap_or_default();
            let Some(status) = &ep.status else {
                warn!(endpoint = id, "endpoint has no status, skipping");
                continue;
            };
            let Some(net) = &status.networking else {
                warn!(endpoint = id, "endpoint has no networking info, skipping");
                continue;
            };
            if net.addressing.is_empty() {
                warn!(endpoint = id, "endpoint has no addresses, skipping");
                continue;
            }
            if net.interface_name.is_empty() {
                warn!(endpoint = id, "endpoint has no interface name, skipping");
                continue;
            }

            for pair in &net.addressing {
                for raw in [&pair.ipv4, &pair.ipv6].into_iter().flatten() {
                    match raw.parse::<IpAddr>() {
                        Ok(ip) => {
                            inventory.addresses.insert(ip);
                        }
                        Err(e) => {
                            warn!(endpoint = id, address = %raw, error = %e, "invalid endpoint address");
                        }
                    }
                }
            }
            inventory.interfaces.insert(net.interface_name.clone());
        }

        debug!(
            addresses = inventory.address_count(),
            interfaces = inventory.interface_count(),
            "managed inventory built"
        );
        inventory
    }

    /// Exact membership test against the managed address set.
    pub fn is_managed_address(&self, ip: &IpAddr) -> bool {
        self.addresses.contains(ip)
    }

    /// Exact membership test against the managed interface names.
    pub fn is_managed_interface(&self, name: &str) -> bool {
        self.interfaces.contains(name)
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        addresses: impl IntoIterator<Item = IpAddr>,
        interfaces: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            addresses: addresses.into_iter().collect(),
            interfaces: interfaces.into_iter().collect(),
        }
    }

    pub fn address_count(&self) -> usize {
        self.addresses.len()
    }

    pub fn interface_count(&self) -> usize {
        self.interfaces.len()
    }
}
