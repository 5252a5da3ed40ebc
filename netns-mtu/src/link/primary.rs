use std::net::IpAddr;

use tracing::{debug, info};

use super::{Link, LinkOps, scan_links};
use crate::error::{Error, Result};
use crate::inventory::ManagedInventory;
use crate::mtu::MtuConfig;
use crate::route::default_routes;

/// The representative veth of a namespace with its current addresses.
///
/// Recomputed every time a namespace is entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryLink {
    pub link: Link,
    pub addrs: Vec<IpAddr>,
}

/// What happened to one namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceOutcome {
    Updated,
    /// No address on the primary link is managed.
    Unmanaged,
    /// The primary link already carries the device MTU.
    AlreadyAtMtu,
}

impl NamespaceOutcome {
    pub fn is_updated(self) -> bool {
        matches!(self, NamespaceOutcome::Updated)
    }
}

/// Find the first veth in the current namespace.
///
/// Candidates whose addresses cannot be listed are passed over.
pub fn primary_link<L: LinkOps>(ops: &L) -> Result<PrimaryLink> {
    let links = scan_links(ops).map_err(|e| Error::LinkNotFound(e.to_string()))?;

    for link in links.iter().filter(|l| l.is_veth()) {
        match ops.addresses(link) {
            Ok(addrs) => {
                return Ok(PrimaryLink {
                    link: link.clone(),
                    addrs,
                });
            }
            Err(e) => {
                info!(link = %link.name, error = %e, "failed to fetch address info for link");
            }
        }
    }

    let names: Vec<&str> = links.iter().map(|l| l.name.as_str()).collect();
    Err(Error::LinkNotFound(format!(
        "no veth among [{}]",
        names.join(", ")
    )))
}

/// Update the routes and primary link MTU in the current namespace.
///
/// Namespaces whose primary link carries no managed address are left
/// alone, as are namespaces already at the device MTU. Otherwise every
/// default route is replaced with the tunnel MTU, then the link is set to
/// the device MTU. Already-replaced routes are not rolled back if a later
/// step fails.
pub fn update_namespace_mtu<L: LinkOps>(
    ops: &L,
    mtu: &MtuConfig,
    inventory: &ManagedInventory,
) -> Result<NamespaceOutcome> {
    let primary = primary_link(ops)?;
    debug!(link = %primary.link.name, "determining whether the link is managed");

    let managed = primary.addrs.iter().any(|addr| {
        debug!(address = %addr, "  looking at address");
        inventory.is_managed_address(addr)
    });
    if !managed {
        debug!(link = %primary.link.name, "no match for link addresses, skipping");
        return Ok(NamespaceOutcome::Unmanaged);
    }
    if primary.link.mtu == mtu.device_mtu() {
        debug!(link = %primary.link.name, "device MTU matches desired MTU, skipping");
        return Ok(NamespaceOutcome::AlreadyAtMtu);
    }

    let routes = default_routes(ops).map_err(|e| Error::RouteListFailed(e.to_string()))?;
    if routes.is_empty() {
        return Err(Error::NoDefaultRoute);
    }
    for mut route in routes {
        route.mtu = Some(mtu.tunnel_mtu());
        ops.replace_route(&route)
            .map_err(|e| Error::RouteMutationFailed {
                route: route.to_string(),
                detail: e.to_string(),
            })?;
        debug!(route = %route, "updated MTU");
    }

    ops.set_mtu(&primary.link, mtu.device_mtu())
        .map_err(|e| Error::LinkMutationFailed {
            link: primary.link.name.clone(),
            detail: e.to_string(),
        })?;
    debug!(link = %primary.link.name, "updated MTU");

    Ok(NamespaceOutcome::Updated)
}
