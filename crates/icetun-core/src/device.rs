//! TUN device creation and configuration.
//!
//! Opens the virtual interface with its negotiated name, address, and MTU,
//! and brings it up. The returned async device is read and written by the
//! relay loop for the lifetime of the process.

use std::net::Ipv4Addr;

use tun::AsyncDevice;

use crate::error::{IcetunError, Result};

/// Open a TUN device, assign `cidr` (e.g. `10.1.0.1/24`), set the MTU, and
/// bring the interface up.
pub fn open_tun(name: &str, cidr: &str, mtu: u16) -> Result<AsyncDevice> {
    let (address, netmask) = parse_cidr(cidr)?;
    let mut config = tun::Configuration::default();
    config
        .name(name)
        .address(address)
        .netmask(netmask)
        .mtu(i32::from(mtu))
        .up();
    Ok(tun::create_as_async(&config)?)
}

fn parse_cidr(cidr: &str) -> Result<(Ipv4Addr, Ipv4Addr)> {
    let (addr, prefix) = cidr.split_once('/').unwrap_or((cidr, "32"));
    let address: Ipv4Addr = addr
        .parse()
        .map_err(|_| IcetunError::Config(format!("invalid interface address {cidr:?}")))?;
    let prefix: u32 = prefix
        .parse()
        .ok()
        .filter(|p| *p <= 32)
        .ok_or_else(|| IcetunError::Config(format!("invalid network prefix in {cidr:?}")))?;
    let mask = match prefix {
        0 => 0,
        p => u32::MAX << (32 - p),
    };
    Ok((address, Ipv4Addr::from(mask)))
}
