/*! Collaborators the client is driven through.

The client never owns the node's routing state or its network interface.
It reads eligible on-mesh prefixes from a [NetworkData] provider, installs
and removes addresses through a [Netif], and takes the clock, the random
number generator and the node identity from a [Context] handed to every
call.
*/

use crate::rand::Rand;
use crate::time::Instant;
use crate::wire::ipv6::MESH_LOCAL_PREFIX_SIZE;
use crate::wire::{Eui64, Ipv6Address, Ipv6Cidr};

/// Per-node state passed into every client operation.
#[derive(Debug)]
pub struct Context {
    now: Instant,
    rand: Rand,
    eui64: Eui64,
    mesh_local_prefix: [u8; MESH_LOCAL_PREFIX_SIZE],
}

impl Context {
    pub fn new(eui64: Eui64, mesh_local_prefix: [u8; MESH_LOCAL_PREFIX_SIZE], seed: u64) -> Self {
        Context {
            now: Instant::ZERO,
            rand: Rand::new(seed),
            eui64,
            mesh_local_prefix,
        }
    }

    pub fn now(&self) -> Instant {
        self.now
    }

    /// Advance the clock. The driver calls this before every poll.
    pub fn set_now(&mut self, now: Instant) {
        self.now = now;
    }

    pub fn rand(&mut self) -> &mut Rand {
        &mut self.rand
    }

    /// The node's hardware identifier.
    pub fn eui64(&self) -> Eui64 {
        self.eui64
    }

    pub fn mesh_local_prefix(&self) -> &[u8; MESH_LOCAL_PREFIX_SIZE] {
        &self.mesh_local_prefix
    }
}

/// An on-mesh prefix as advertised in the network data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OnMeshPrefix {
    pub prefix: Ipv6Cidr,
    /// The advertising agent assigns addresses in this prefix.
    pub dhcp: bool,
    /// Short address of the advertising agent.
    pub rloc16: u16,
}

/// Opaque cursor over the on-mesh prefixes of a [NetworkData] provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NetworkDataIterator(usize);

impl NetworkDataIterator {
    /// A cursor positioned before the first prefix.
    pub const INIT: Self = Self(0);

    pub const fn new(position: usize) -> Self {
        Self(position)
    }

    pub const fn position(&self) -> usize {
        self.0
    }
}

/// Source of the on-mesh prefixes currently in the network data.
pub trait NetworkData {
    /// Return the prefix under `iter` and advance it, or `None` once the
    /// prefixes are exhausted.
    fn next_on_mesh_prefix(&self, iter: &mut NetworkDataIterator) -> Option<OnMeshPrefix>;
}

impl NetworkData for [OnMeshPrefix] {
    fn next_on_mesh_prefix(&self, iter: &mut NetworkDataIterator) -> Option<OnMeshPrefix> {
        let prefix = self.get(iter.0)?;
        iter.0 += 1;
        Some(*prefix)
    }
}

bitflags::bitflags! {
    /// State flags of an interface address.
    #[derive(Default)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct AddressFlags: u8 {
        const PREFERRED = 0b01;
        const VALID = 0b10;
    }
}

impl AddressFlags {
    /// Flags for an address with the given lifetimes: a zero lifetime
    /// leaves the corresponding flag clear.
    pub fn from_lifetimes(preferred_lifetime: u32, valid_lifetime: u32) -> Self {
        let mut flags = AddressFlags::empty();
        flags.set(AddressFlags::PREFERRED, preferred_lifetime != 0);
        flags.set(AddressFlags::VALID, valid_lifetime != 0);
        flags
    }
}

/// Where an interface address came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressOrigin {
    #[default]
    Thread,
    Slaac,
    Dhcpv6,
    Manual,
}

/// A unicast address as installed on the network interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NetifAddress {
    pub address: Ipv6Address,
    pub prefix_len: u8,
    pub flags: AddressFlags,
    pub origin: AddressOrigin,
}

impl NetifAddress {
    pub const EMPTY: Self = NetifAddress {
        address: Ipv6Address::UNSPECIFIED,
        prefix_len: 0,
        flags: AddressFlags::empty(),
        origin: AddressOrigin::Thread,
    };

    pub fn cidr(&self) -> Ipv6Cidr {
        Ipv6Cidr::new(self.address, self.prefix_len.min(128))
    }
}

/// The node's network interface.
pub trait Netif {
    fn add_unicast_address(&mut self, address: &NetifAddress);
    fn remove_unicast_address(&mut self, address: &NetifAddress);
}

#[cfg(test)]
mod test {
    use super::*;

    const PREFIX: Ipv6Address = Ipv6Address::new(0xfd00, 0x0db8, 0, 0, 0, 0, 0, 0);

    #[test]
    fn test_slice_network_data() {
        let prefixes = [
            OnMeshPrefix {
                prefix: Ipv6Cidr::new(PREFIX, 64),
                dhcp: true,
                rloc16: 0x5400,
            },
            OnMeshPrefix {
                prefix: Ipv6Cidr::new(Ipv6Address::new(0xfd00, 0x0db9, 0, 0, 0, 0, 0, 0), 64),
                dhcp: false,
                rloc16: 0x5800,
            },
        ];
        let netdata: &[OnMeshPrefix] = &prefixes;

        let mut iter = NetworkDataIterator::INIT;
        assert_eq!(netdata.next_on_mesh_prefix(&mut iter), Some(prefixes[0]));
        assert_eq!(netdata.next_on_mesh_prefix(&mut iter), Some(prefixes[1]));
        assert_eq!(netdata.next_on_mesh_prefix(&mut iter), None);
        assert_eq!(netdata.next_on_mesh_prefix(&mut iter), None);
        assert_eq!(iter.position(), 2);
    }

    #[test]
    fn test_flags_from_lifetimes() {
        assert_eq!(
            AddressFlags::from_lifetimes(3600, 7200),
            AddressFlags::PREFERRED | AddressFlags::VALID
        );
        assert_eq!(AddressFlags::from_lifetimes(0, 7200), AddressFlags::VALID);
        assert_eq!(AddressFlags::from_lifetimes(0, 0), AddressFlags::empty());
    }

    #[test]
    fn test_context_clock() {
        let mut cx = Context::new(Eui64([1; 8]), [0xfd, 0, 0, 0, 0, 0, 0, 0], 1);
        assert_eq!(cx.now(), Instant::ZERO);
        cx.set_now(Instant::from_secs(5));
        assert_eq!(cx.now().total_millis(), 5000);
    }
}
