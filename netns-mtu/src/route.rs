//! Routing table entries and default-route selection.

use std::fmt;

use tracing::debug;

use crate::error::Result;
use crate::link::LinkOps;

/// Address family of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    /// `ip` command flag selecting this family.
    pub fn flag(self) -> &'static str {
        match self {
            Family::V4 => "-4",
            Family::V6 => "-6",
        }
    }
}

/// A route in the current namespace's main table.
///
/// Carries every attribute needed to re-install the route unchanged apart
/// from its MTU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub family: Family,
    /// Route type (`unreachable`, `blackhole`, ...); `None` for unicast.
    pub kind: Option<String>,
    /// Destination prefix; `None` covers all destinations.
    pub dst: Option<String>,
    pub gateway: Option<String>,
    pub dev: Option<String>,
    pub protocol: Option<String>,
    pub scope: Option<String>,
    /// Preferred source address.
    pub prefsrc: Option<String>,
    pub metric: Option<u32>,
    /// Gateway is reachable on `dev` without a covering link route.
    pub onlink: bool,
    pub mtu: Option<u32>,
}

impl Route {
    /// A default route is one without a destination prefix.
    pub fn is_default(&self) -> bool {
        self.dst.is_none()
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(kind) = &self.kind {
            write!(f, "{kind} ")?;
        }
        write!(f, "{}", self.dst.as_deref().unwrap_or("default"))?;
        if let Some(gw) = &self.gateway {
            write!(f, " via {gw}")?;
        }
        if let Some(dev) = &self.dev {
            write!(f, " dev {dev}")?;
        }
        if let Some(src) = &self.prefsrc {
            write!(f, " src {src}")?;
        }
        if self.onlink {
            write!(f, " onlink")?;
        }
        if let Some(mtu) = self.mtu {
            write!(f, " mtu {mtu}")?;
        }
        Ok(())
    }
}

/// Fetch the default routes (both IPv4 and IPv6) of the current namespace.
pub fn default_routes<L: LinkOps>(ops: &L) -> Result<Vec<Route>> {
    debug!("listing routes");
    let routes = ops.routes()?;
    debug!(count = routes.len(), "found routes");

    let defaults: Vec<Route> = routes
        .into_iter()
        .inspect(|r| debug!(route = %r, "  route"))
        .filter(Route::is_default)
        .collect();
    Ok(defaults)
}
