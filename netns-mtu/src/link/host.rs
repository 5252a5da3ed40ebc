use tracing::{debug, info, warn};

use super::{Link, LinkOps};
use crate::inventory::ManagedInventory;
use crate::reconcile::Tally;

/// Name prefix of the tunnel infrastructure devices owned by the agent.
pub const TUNNEL_LINK_PREFIX: &str = "cilium";

/// Update the MTU of host namespace devices.
///
/// Managed endpoint devices are raised first so they can receive the new
/// MTU; tunnel devices are deferred to a second pass and always updated,
/// since they transmit into the links changed in the first pass.
pub fn update_host_links<L: LinkOps>(
    ops: &L,
    links: &[Link],
    device_mtu: u32,
    inventory: &ManagedInventory,
) -> Tally {
    debug!("updating host namespace devices");
    let mut tally = Tally::default();

    let deferred = endpoint_pass(ops, links, device_mtu, inventory, &mut tally);
    tunnel_pass(ops, &deferred, device_mtu, &mut tally);

    info!(
        "Updated {}/{} local devices, {} skipped, {} failed",
        tally.updated,
        links.len(),
        tally.skipped,
        tally.failed
    );
    tally
}

/// First pass: update managed devices, return tunnel devices untouched and
/// uncounted.
fn endpoint_pass<'l, L: LinkOps>(
    ops: &L,
    links: &'l [Link],
    device_mtu: u32,
    inventory: &ManagedInventory,
    tally: &mut Tally,
) -> Vec<&'l Link> {
    let mut deferred = Vec::new();
    for link in links {
        if link.mtu == device_mtu {
            debug!(link = %link.name, "device has desired MTU");
            tally.skipped += 1;
        } else if link.name.starts_with(TUNNEL_LINK_PREFIX) {
            deferred.push(link);
        } else if inventory.is_managed_interface(&link.name) {
            set_link_mtu(ops, link, device_mtu, tally);
        } else {
            tally.skipped += 1;
        }
    }
    deferred
}

/// Second pass: tunnel devices are updated without a membership check.
fn tunnel_pass<L: LinkOps>(ops: &L, links: &[&Link], device_mtu: u32, tally: &mut Tally) {
    for link in links {
        if link.mtu == device_mtu {
            debug!(link = %link.name, "device has desired MTU");
            tally.skipped += 1;
            continue;
        }
        set_link_mtu(ops, link, device_mtu, tally);
    }
}

fn set_link_mtu<L: LinkOps>(ops: &L, link: &Link, device_mtu: u32, tally: &mut Tally) {
    debug!(link = %link.name, "updating MTU for device");
    match ops.set_mtu(link, device_mtu) {
        Ok(()) => tally.updated += 1,
        Err(e) => {
            tally.failed += 1;
            warn!(link = %link.name, error = %e, "failed to set link MTU");
        }
    }
}
