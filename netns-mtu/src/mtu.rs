//! MTU configuration and validation.

use crate::error::{Error, Result};

/// Standard Ethernet MTU.
pub const ETHERNET_MTU: u32 = 1500;
/// VXLAN encapsulation overhead.
pub const TUNNEL_OVERHEAD: u32 = 50;
/// Requesting this MTU asks for autodetection, which is not supported.
pub const AUTODETECT_MTU: u32 = 0;

/// All hosts must be able to receive 576B datagrams (RFC 791).
const MIN_MTU: u32 = 576;
/// Maximum Geneve tunnel overhead (draft-ietf-nvo3-geneve-06).
const MAX_TUNNEL_OVERHEAD: u32 = 310;

/// Validated MTU values for one reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MtuConfig {
    device_mtu: u32,
    tunnel_mtu: u32,
}

impl MtuConfig {
    /// Validate the requested device MTU and tunnel overhead.
    ///
    /// Returns the device MTU together with the MTU for tunnelled routes
    /// (`device_mtu - tunnel_overhead`).
    pub fn sanitize(device_mtu: u32, tunnel_overhead: u32) -> Result<Self> {
        if device_mtu == AUTODETECT_MTU {
            return Err(Error::ConfigInvalid(
                "MTU autodetection is not supported; specify an explicit MTU".into(),
            ));
        }
        if device_mtu < MIN_MTU {
            return Err(Error::ConfigInvalid(format!(
                "MTU {device_mtu} is too short"
            )));
        }
        if tunnel_overhead > MAX_TUNNEL_OVERHEAD {
            return Err(Error::ConfigInvalid(format!(
                "invalid tunnel overhead {tunnel_overhead}"
            )));
        }

        Ok(Self {
            device_mtu,
            tunnel_mtu: device_mtu - tunnel_overhead,
        })
    }

    pub fn device_mtu(&self) -> u32 {
        self.device_mtu
    }

    pub fn tunnel_mtu(&self) -> u32 {
        self.tunnel_mtu
    }
}
