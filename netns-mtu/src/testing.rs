//! In-memory kernel used by unit tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::inventory::{
    AddressPair, Endpoint, EndpointNetworking, EndpointSource, EndpointStatus, ManagedInventory,
};
use crate::link::{Link, LinkOps};
use crate::netns::NamespaceOps;
use crate::route::{Family, Route};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    SetMtu { ns: u64, link: String, mtu: u32 },
    ReplaceRoute { ns: u64, route: String, mtu: u32 },
}

#[derive(Debug)]
pub struct FakeHandle {
    inode: u64,
    identifiable: bool,
    closed: Rc<RefCell<Vec<u64>>>,
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.closed.borrow_mut().push(self.inode);
    }
}

enum PathTarget {
    Ns(u64),
    Unopenable,
    Unidentifiable(u64),
}

#[derive(Default)]
struct FakeNetns {
    links: Vec<Link>,
    addrs: HashMap<String, Vec<IpAddr>>,
    routes: Vec<Route>,
    fail_links: bool,
    fail_routes: bool,
    fail_addresses: HashSet<String>,
    fail_set_mtu: HashSet<String>,
    route_replace_budget: Option<usize>,
}

struct State {
    active: u64,
    namespaces: BTreeMap<u64, FakeNetns>,
    paths: Vec<(PathBuf, PathTarget)>,
    fail_current: bool,
    fail_enter: HashSet<u64>,
    mutations: Vec<Mutation>,
}

/// Namespaces keyed by inode, each with its own links, addresses and
/// routes. Link operations apply to whichever namespace is active.
pub struct FakeKernel {
    state: RefCell<State>,
    closed: Rc<RefCell<Vec<u64>>>,
}

fn fake_err(detail: &str) -> Error {
    Error::Io(std::io::Error::other(detail.to_string()))
}

impl FakeKernel {
    pub fn new(root: u64) -> Self {
        let mut namespaces = BTreeMap::new();
        namespaces.insert(root, FakeNetns::default());
        Self {
            state: RefCell::new(State {
                active: root,
                namespaces,
                paths: Vec::new(),
                fail_current: false,
                fail_enter: HashSet::new(),
                mutations: Vec::new(),
            }),
            closed: Rc::new(RefCell::new(Vec::new())),
        }
    }

    fn with_ns<R>(&self, inode: u64, f: impl FnOnce(&mut FakeNetns) -> R) -> R {
        let mut state = self.state.borrow_mut();
        f(state.namespaces.entry(inode).or_default())
    }

    fn with_active<R>(&self, f: impl FnOnce(&mut FakeNetns, u64) -> R) -> R {
        let mut state = self.state.borrow_mut();
        let active = state.active;
        f(state.namespaces.entry(active).or_default(), active)
    }

    fn record(&self, mutation: Mutation) {
        self.state.borrow_mut().mutations.push(mutation);
    }

    // -- setup --

    pub fn add_namespace(&self, inode: u64) {
        self.with_ns(inode, |_| ());
    }

    pub fn add_path(&self, path: &str, inode: u64) {
        self.state
            .borrow_mut()
            .paths
            .push((PathBuf::from(path), PathTarget::Ns(inode)));
    }

    pub fn add_unopenable_path(&self, path: &str) {
        self.state
            .borrow_mut()
            .paths
            .push((PathBuf::from(path), PathTarget::Unopenable));
    }

    pub fn add_unidentifiable_path(&self, path: &str, inode: u64) {
        self.state
            .borrow_mut()
            .paths
            .push((PathBuf::from(path), PathTarget::Unidentifiable(inode)));
    }

    pub fn set_links(&self, ns: u64, links: Vec<Link>) {
        self.with_ns(ns, |n| n.links = links);
    }

    pub fn set_addrs(&self, ns: u64, link: &str, addrs: &[&str]) {
        let addrs: Vec<IpAddr> = addrs.iter().map(|a| a.parse().unwrap()).collect();
        self.with_ns(ns, |n| {
            n.addrs.insert(link.to_string(), addrs);
        });
    }

    pub fn set_routes(&self, ns: u64, routes: Vec<Route>) {
        self.with_ns(ns, |n| n.routes = routes);
    }

    // -- fault injection --

    pub fn fail_current(&self) {
        self.state.borrow_mut().fail_current = true;
    }

    pub fn fail_enter(&self, inode: u64) {
        self.state.borrow_mut().fail_enter.insert(inode);
    }

    pub fn fail_links(&self, ns: u64) {
        self.with_ns(ns, |n| n.fail_links = true);
    }

    pub fn fail_routes(&self, ns: u64) {
        self.with_ns(ns, |n| n.fail_routes = true);
    }

    pub fn fail_addresses(&self, ns: u64, link: &str) {
        self.with_ns(ns, |n| {
            n.fail_addresses.insert(link.to_string());
        });
    }

    pub fn fail_set_mtu(&self, ns: u64, link: &str) {
        self.with_ns(ns, |n| {
            n.fail_set_mtu.insert(link.to_string());
        });
    }

    /// Let `n` route replacements succeed in `ns`, then fail the rest.
    pub fn fail_route_replace_after(&self, ns: u64, n: usize) {
        self.with_ns(ns, |netns| netns.route_replace_budget = Some(n));
    }

    // -- inspection --

    pub fn handle(&self, inode: u64) -> FakeHandle {
        FakeHandle {
            inode,
            identifiable: true,
            closed: Rc::clone(&self.closed),
        }
    }

    pub fn active(&self) -> u64 {
        self.state.borrow().active
    }

    /// Inodes of every handle released so far, in release order.
    pub fn closed(&self) -> Vec<u64> {
        self.closed.borrow().clone()
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        self.state.borrow().mutations.clone()
    }

    pub fn link_mtu(&self, ns: u64, name: &str) -> Option<u32> {
        self.with_ns(ns, |n| {
            n.links.iter().find(|l| l.name == name).map(|l| l.mtu)
        })
    }
}

impl NamespaceOps for FakeKernel {
    type Handle = FakeHandle;

    fn current(&self) -> Result<FakeHandle> {
        if self.state.borrow().fail_current {
            return Err(fake_err("no current netns"));
        }
        Ok(self.handle(self.active()))
    }

    fn candidates(&self) -> Result<Vec<PathBuf>> {
        Ok(self
            .state
            .borrow()
            .paths
            .iter()
            .map(|(p, _)| p.clone())
            .collect())
    }

    fn open(&self, path: &Path) -> Result<FakeHandle> {
        let state = self.state.borrow();
        let target = state
            .paths
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, t)| t)
            .ok_or_else(|| fake_err("no such path"))?;
        match target {
            PathTarget::Ns(inode) => Ok(self.handle(*inode)),
            PathTarget::Unopenable => Err(fake_err("permission denied")),
            PathTarget::Unidentifiable(inode) => Ok(FakeHandle {
                inode: *inode,
                identifiable: false,
                closed: Rc::clone(&self.closed),
            }),
        }
    }

    fn identity(&self, handle: &FakeHandle) -> Result<u64> {
        if handle.identifiable {
            Ok(handle.inode)
        } else {
            Err(fake_err("stat failed"))
        }
    }

    fn enter(&self, handle: &FakeHandle) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_enter.contains(&handle.inode) {
            return Err(fake_err("invalid argument"));
        }
        state.active = handle.inode;
        Ok(())
    }
}

impl LinkOps for FakeKernel {
    fn links(&self) -> Result<Vec<Link>> {
        self.with_active(|n, _| {
            if n.fail_links {
                return Err(fake_err("netlink dump failed"));
            }
            Ok(n.links.clone())
        })
    }

    fn addresses(&self, link: &Link) -> Result<Vec<IpAddr>> {
        self.with_active(|n, _| {
            if n.fail_addresses.contains(&link.name) {
                return Err(fake_err("address dump failed"));
            }
            Ok(n.addrs.get(&link.name).cloned().unwrap_or_default())
        })
    }

    fn set_mtu(&self, link: &Link, mtu: u32) -> Result<()> {
        let ns = self.with_active(|n, ns| {
            if n.fail_set_mtu.contains(&link.name) {
                return Err(fake_err("operation not permitted"));
            }
            if let Some(l) = n.links.iter_mut().find(|l| l.name == link.name) {
                l.mtu = mtu;
            }
            Ok(ns)
        })?;
        self.record(Mutation::SetMtu {
            ns,
            link: link.name.clone(),
            mtu,
        });
        Ok(())
    }

    fn routes(&self) -> Result<Vec<Route>> {
        self.with_active(|n, _| {
            if n.fail_routes {
                return Err(fake_err("route dump failed"));
            }
            Ok(n.routes.clone())
        })
    }

    fn replace_route(&self, route: &Route) -> Result<()> {
        let ns = self.with_active(|n, ns| {
            match n.route_replace_budget {
                Some(0) => return Err(fake_err("no such device")),
                Some(left) => n.route_replace_budget = Some(left - 1),
                None => {}
            }
            Ok(ns)
        })?;
        let bare = Route {
            mtu: None,
            ..route.clone()
        };
        self.record(Mutation::ReplaceRoute {
            ns,
            route: bare.to_string(),
            mtu: route.mtu.unwrap_or_default(),
        });
        Ok(())
    }
}

/// Endpoint source returning canned records, or failing.
pub struct FakeSource {
    endpoints: Option<Vec<Endpoint>>,
}

impl FakeSource {
    /// One endpoint per `(interface, address)` pair.
    pub fn endpoints(pairs: &[(&str, &str)]) -> Self {
        let endpoints = pairs
            .iter()
            .enumerate()
            .map(|(i, (iface, addr))| Endpoint {
                id: Some(i as u64),
                status: Some(EndpointStatus {
                    networking: Some(EndpointNetworking {
                        addressing: vec![AddressPair {
                            ipv4: Some(addr.to_string()),
                            ipv6: None,
                        }],
                        interface_name: iface.to_string(),
                    }),
                }),
            })
            .collect();
        Self {
            endpoints: Some(endpoints),
        }
    }

    pub fn failing() -> Self {
        Self { endpoints: None }
    }
}

impl EndpointSource for FakeSource {
    fn endpoints(&self) -> Result<Vec<Endpoint>> {
        self.endpoints
            .clone()
            .ok_or_else(|| Error::InventoryUnavailable("connection refused".into()))
    }
}

pub fn link(name: &str, kind: Option<&str>, mtu: u32) -> Link {
    Link {
        index: 0,
        name: name.to_string(),
        kind: kind.map(String::from),
        mtu,
    }
}

pub fn veth(name: &str, mtu: u32) -> Link {
    link(name, Some("veth"), mtu)
}

pub fn route(family: Family, dst: Option<&str>, dev: &str) -> Route {
    Route {
        family,
        kind: None,
        dst: dst.map(String::from),
        gateway: None,
        dev: Some(dev.to_string()),
        protocol: None,
        scope: None,
        prefsrc: None,
        metric: None,
        onlink: false,
        mtu: None,
    }
}

pub fn inventory(addrs: &[&str], interfaces: &[&str]) -> ManagedInventory {
    ManagedInventory::from_parts(
        addrs.iter().map(|a| a.parse().unwrap()),
        interfaces.iter().map(|i| i.to_string()),
    )
}
