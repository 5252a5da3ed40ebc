//! [`LinkOps`] backed by the iproute2 `ip` command in JSON mode.

use std::net::IpAddr;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{Link, LinkOps};
use crate::command::exec;
use crate::error::{Error, Result};
use crate::route::{Family, Route};

/// Default iproute2 binary.
pub const IP_BINARY: &str = "ip";

/// RTNETLINK reply for a family the kernel was booted without.
const FAMILY_UNSUPPORTED: &str = "Address family not supported";

const ONLINK_FLAG: &str = "onlink";

// ---------------------------------------------------------------------------
// JSON shapes emitted by `ip -j`
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct IpLink {
    ifindex: u32,
    ifname: String,
    #[serde(default)]
    mtu: u32,
    #[serde(default)]
    linkinfo: Option<IpLinkInfo>,
}

#[derive(Debug, Deserialize)]
struct IpLinkInfo {
    #[serde(default)]
    info_kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IpAddrEntry {
    #[serde(default)]
    addr_info: Vec<IpAddrInfo>,
}

#[derive(Debug, Deserialize)]
struct IpAddrInfo {
    #[serde(default)]
    local: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IpRoute {
    /// Only printed for non-unicast routes.
    #[serde(default, rename = "type")]
    kind: Option<String>,
    dst: String,
    #[serde(default)]
    gateway: Option<String>,
    #[serde(default)]
    dev: Option<String>,
    #[serde(default)]
    protocol: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    prefsrc: Option<String>,
    #[serde(default)]
    metric: Option<u32>,
    #[serde(default)]
    flags: Vec<String>,
    #[serde(default)]
    metrics: Vec<IpRouteMetrics>,
}

#[derive(Debug, Deserialize)]
struct IpRouteMetrics {
    #[serde(default)]
    mtu: Option<u32>,
}

// ---------------------------------------------------------------------------
// Parsing & argument building (pure functions)
// ---------------------------------------------------------------------------

/// `ip -j` prints nothing instead of `[]` for some empty listings.
fn parse_json<T: DeserializeOwned>(output: &str, what: &str) -> Result<Vec<T>> {
    if output.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(output).map_err(|e| Error::Parse(format!("{what}: {e}")))
}

fn parse_links(output: &str) -> Result<Vec<Link>> {
    let links: Vec<IpLink> = parse_json(output, "link list")?;
    Ok(links
        .into_iter()
        .map(|l| Link {
            index: l.ifindex,
            name: l.ifname,
            kind: l.linkinfo.and_then(|info| info.info_kind),
            mtu: l.mtu,
        })
        .collect())
}

fn parse_addresses(output: &str) -> Result<Vec<IpAddr>> {
    let entries: Vec<IpAddrEntry> = parse_json(output, "address list")?;
    let mut addrs: Vec<IpAddr> = Vec::new();
    for info in entries.into_iter().flat_map(|e| e.addr_info) {
        let Some(local) = info.local else { continue };
        match local.parse::<IpAddr>() {
            Ok(ip) => addrs.push(ip),
            Err(e) => debug!(address = %local, error = %e, "ignoring unparseable address"),
        }
    }
    Ok(addrs)
}

fn parse_routes(output: &str, family: Family) -> Result<Vec<Route>> {
    let routes: Vec<IpRoute> = parse_json(output, "route list")?;
    Ok(routes
        .into_iter()
        .map(|r| Route {
            family,
            kind: r.kind.filter(|k| k != "unicast"),
            dst: (r.dst != "default").then_some(r.dst),
            gateway: r.gateway,
            dev: r.dev,
            protocol: r.protocol,
            scope: r.scope,
            prefsrc: r.prefsrc,
            metric: r.metric,
            onlink: r.flags.iter().any(|f| f == ONLINK_FLAG),
            mtu: r.metrics.iter().find_map(|m| m.mtu),
        })
        .collect())
}

/// Arguments for `ip <family> route replace ...` reproducing `route`.
///
/// Every attribute read by [`parse_routes`] is written back, so the
/// replaced route differs from the listed one only in what the caller
/// changed.
fn route_replace_args(route: &Route) -> Vec<String> {
    let mut args = vec![
        route.family.flag().to_string(),
        "route".to_string(),
        "replace".to_string(),
    ];
    if let Some(kind) = &route.kind {
        args.push(kind.clone());
    }
    args.push(route.dst.clone().unwrap_or_else(|| "default".to_string()));
    if let Some(gw) = &route.gateway {
        args.extend(["via".to_string(), gw.clone()]);
    }
    if let Some(dev) = &route.dev {
        args.extend(["dev".to_string(), dev.clone()]);
    }
    if let Some(proto) = &route.protocol {
        args.extend(["proto".to_string(), proto.clone()]);
    }
    if let Some(scope) = &route.scope {
        args.extend(["scope".to_string(), scope.clone()]);
    }
    if let Some(src) = &route.prefsrc {
        args.extend(["src".to_string(), src.clone()]);
    }
    if let Some(metric) = route.metric {
        args.extend(["metric".to_string(), metric.to_string()]);
    }
    if route.onlink {
        args.push(ONLINK_FLAG.to_string());
    }
    if let Some(mtu) = route.mtu {
        args.extend(["mtu".to_string(), mtu.to_string()]);
    }
    args
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// Runs `ip` synchronously on the calling thread, so results reflect the
/// namespace that thread is attached to.
#[derive(Debug, Clone)]
pub struct IpRoute2 {
    binary: String,
}

impl Default for IpRoute2 {
    fn default() -> Self {
        Self::new(IP_BINARY)
    }
}

impl IpRoute2 {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn ip(&self, args: &[&str]) -> Result<String> {
        Ok(exec(&self.binary, args)?)
    }
}

impl LinkOps for IpRoute2 {
    fn links(&self) -> Result<Vec<Link>> {
        parse_links(&self.ip(&["-j", "-d", "link", "show"])?)
    }

    fn addresses(&self, link: &Link) -> Result<Vec<IpAddr>> {
        parse_addresses(&self.ip(&["-j", "addr", "show", "dev", &link.name])?)
    }

    fn set_mtu(&self, link: &Link, mtu: u32) -> Result<()> {
        let mtu = mtu.to_string();
        self.ip(&["link", "set", "dev", &link.name, "mtu", &mtu])?;
        Ok(())
    }

    /// A family the kernel does not support (e.g. `ipv6.disable=1`)
    /// contributes no routes instead of failing the listing.
    fn routes(&self) -> Result<Vec<Route>> {
        let mut routes = Vec::new();
        for family in [Family::V4, Family::V6] {
            let output = match exec(&self.binary, &["-j", family.flag(), "route", "show"]) {
                Ok(output) => output,
                Err(e) if e.detail.contains(FAMILY_UNSUPPORTED) => {
                    debug!(family = family.flag(), "address family not supported, no routes");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            routes.extend(parse_routes(&output, family)?);
        }
        Ok(routes)
    }

    fn replace_route(&self, route: &Route) -> Result<()> {
        let args = route_replace_args(route);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.ip(&args)?;
        Ok(())
    }
}
