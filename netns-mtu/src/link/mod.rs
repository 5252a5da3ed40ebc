//! Kernel links and the operations that mutate their MTU.

mod host;
mod iproute;
mod primary;

use std::net::IpAddr;

use tracing::debug;

use crate::error::Result;
use crate::route::Route;

pub use host::{TUNNEL_LINK_PREFIX, update_host_links};
pub use iproute::{IP_BINARY, IpRoute2};
pub use primary::{NamespaceOutcome, PrimaryLink, primary_link, update_namespace_mtu};

/// Kernel link kind of the namespace-facing end of a veth pair.
pub const VETH_KIND: &str = "veth";

/// A network interface in the current namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub index: u32,
    pub name: String,
    /// Kernel link kind (`veth`, `vxlan`, ...); `None` for plain devices.
    pub kind: Option<String>,
    pub mtu: u32,
}

impl Link {
    pub fn is_veth(&self) -> bool {
        self.kind.as_deref() == Some(VETH_KIND)
    }
}

/// Link and route primitives, always applied to the namespace the calling
/// thread is attached to.
pub trait LinkOps {
    fn links(&self) -> Result<Vec<Link>>;
    /// Addresses (both families) assigned to `link`.
    fn addresses(&self, link: &Link) -> Result<Vec<IpAddr>>;
    fn set_mtu(&self, link: &Link, mtu: u32) -> Result<()>;
    /// Routes of both families in the main table.
    fn routes(&self) -> Result<Vec<Route>>;
    /// Upsert `route`, including its MTU.
    fn replace_route(&self, route: &Route) -> Result<()>;
}

/// Find all links in the current namespace.
pub fn scan_links<L: LinkOps>(ops: &L) -> Result<Vec<Link>> {
    debug!("fetching links");
    let links = ops.links()?;

    debug!(count = links.len(), "found links");
    for link in &links {
        debug!(
            name = %link.name,
            kind = link.kind.as_deref().unwrap_or("device"),
            mtu = link.mtu,
            "  link"
        );
    }
    Ok(links)
}
