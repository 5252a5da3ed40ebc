//! Propagates one MTU across every network namespace on a host.
//!
//! A pass discovers all network namespaces through `/proc`, enters each one,
//! and updates the primary veth and its default routes when the veth carries
//! an address managed by the control plane. Host devices are updated last:
//! managed endpoint devices first, then tunnel devices.

mod command;
mod error;
mod inventory;
mod link;
mod mtu;
mod netns;
mod prerequisites;
mod reconcile;
mod route;

#[cfg(test)]
mod testing;

pub use command::CommandError;
pub use error::{Error, Result};
pub use inventory::{
    AddressPair, CiliumCli, Endpoint, EndpointFile, EndpointNetworking, EndpointSource,
    EndpointStatus, ManagedInventory,
};
pub use link::{
    IP_BINARY, IpRoute2, Link, LinkOps, NamespaceOutcome, PrimaryLink, TUNNEL_LINK_PREFIX,
    VETH_KIND, primary_link, scan_links, update_host_links, update_namespace_mtu,
};
pub use mtu::{AUTODETECT_MTU, ETHERNET_MTU, MtuConfig, TUNNEL_OVERHEAD};
pub use netns::{
    Namespace, NamespaceGuard, NamespaceOps, NamespaceSet, PROC_ROOT, ProcNamespaces,
    scan_namespaces,
};
pub use prerequisites::check_prerequisites;
pub use reconcile::{ReconcileReport, Reconciler, Tally};
pub use route::{Family, Route, default_routes};
