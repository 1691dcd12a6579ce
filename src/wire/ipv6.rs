#![deny(missing_docs)]
//! IPv6 addresses and prefixes as the mesh uses them.

use byteorder::{ByteOrder, NetworkEndian};
use core::fmt;

/// Size of IPv6 addresses in octets.
pub const ADDR_SIZE: usize = 16;

/// Size of a mesh-local prefix in octets.
pub const MESH_LOCAL_PREFIX_SIZE: usize = 8;

/// A sixteen-octet IPv6 address.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Address(pub [u8; ADDR_SIZE]);

impl Address {
    /// The [unspecified address].
    ///
    /// [unspecified address]: https://tools.ietf.org/html/rfc4291#section-2.5.2
    pub const UNSPECIFIED: Address = Address([0x00; ADDR_SIZE]);

    /// The realm-local all-routers multicast address, `ff03::2`.
    ///
    /// On a mesh every router joins this group, so a request sent here
    /// reaches every address-assigning agent.
    pub const REALM_LOCAL_ALL_ROUTERS: Address = Address([
        0xff, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x02,
    ]);

    /// Construct an IPv6 address from parts.
    #[allow(clippy::too_many_arguments)]
    pub const fn new(a0: u16, a1: u16, a2: u16, a3: u16, a4: u16, a5: u16, a6: u16, a7: u16) -> Address {
        Address([
            (a0 >> 8) as u8,
            a0 as u8,
            (a1 >> 8) as u8,
            a1 as u8,
            (a2 >> 8) as u8,
            a2 as u8,
            (a3 >> 8) as u8,
            a3 as u8,
            (a4 >> 8) as u8,
            a4 as u8,
            (a5 >> 8) as u8,
            a5 as u8,
            (a6 >> 8) as u8,
            a6 as u8,
            (a7 >> 8) as u8,
            a7 as u8,
        ])
    }

    /// Construct an IPv6 address from a sequence of octets, in big-endian.
    ///
    /// # Panics
    /// The function panics if `data` is not sixteen octets long.
    pub fn from_bytes(data: &[u8]) -> Address {
        let mut bytes = [0; ADDR_SIZE];
        bytes.copy_from_slice(data);
        Address(bytes)
    }

    /// The routing locator of the node with short address `rloc16`: the
    /// mesh-local prefix followed by the interface identifier
    /// `0000:00ff:fe00:<rloc16>`.
    pub fn routing_locator(mesh_local_prefix: &[u8; MESH_LOCAL_PREFIX_SIZE], rloc16: u16) -> Address {
        let mut bytes = [0; ADDR_SIZE];
        bytes[..MESH_LOCAL_PREFIX_SIZE].copy_from_slice(mesh_local_prefix);
        bytes[11] = 0xff;
        bytes[12] = 0xfe;
        NetworkEndian::write_u16(&mut bytes[14..16], rloc16);
        Address(bytes)
    }

    /// Return an IPv6 address as a sequence of octets, in big-endian.
    pub const fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Query whether the IPv6 address is an unicast address.
    pub fn is_unicast(&self) -> bool {
        !(self.is_multicast() || self.is_unspecified())
    }

    /// Query whether the IPv6 address is a [multicast address].
    ///
    /// [multicast address]: https://tools.ietf.org/html/rfc4291#section-2.7
    pub const fn is_multicast(&self) -> bool {
        self.0[0] == 0xff
    }

    /// Query whether the IPv6 address is the [unspecified address].
    ///
    /// [unspecified address]: https://tools.ietf.org/html/rfc4291#section-2.5.2
    pub fn is_unspecified(&self) -> bool {
        self.0 == [0x00; ADDR_SIZE]
    }

    /// The number of leading bits this address shares with `other`.
    pub fn prefix_match_len(&self, other: &Address) -> u8 {
        let mut len = 0;
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            let diff = a ^ b;
            if diff != 0 {
                return len + diff.leading_zeros() as u8;
            }
            len += 8;
        }
        len
    }
}

#[cfg(feature = "std")]
impl From<::std::net::Ipv6Addr> for Address {
    fn from(x: ::std::net::Ipv6Addr) -> Address {
        Address(x.octets())
    }
}

#[cfg(feature = "std")]
impl From<Address> for ::std::net::Ipv6Addr {
    fn from(Address(x): Address) -> ::std::net::Ipv6Addr {
        x.into()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut words = [0u16; 8];
        for (i, word) in words.iter_mut().enumerate() {
            *word = NetworkEndian::read_u16(&self.0[i * 2..i * 2 + 2]);
        }

        // The longest run of two or more zero words is shortened to `::`.
        let (mut best_start, mut best_len) = (0, 0);
        let mut i = 0;
        while i < words.len() {
            if words[i] == 0 {
                let start = i;
                while i < words.len() && words[i] == 0 {
                    i += 1;
                }
                if i - start > best_len {
                    best_start = start;
                    best_len = i - start;
                }
            } else {
                i += 1;
            }
        }
        if best_len < 2 {
            best_len = 0;
        }

        let mut i = 0;
        while i < words.len() {
            if best_len > 0 && i == best_start {
                write!(f, "::")?;
                i += best_len;
                continue;
            }
            if i != 0 && !(best_len > 0 && i == best_start + best_len) {
                write!(f, ":")?;
            }
            write!(f, "{:x}", words[i])?;
            i += 1;
        }
        Ok(())
    }
}

/// A specification of an IPv6 CIDR block, containing an address and a variable-length
/// subnet masking prefix length.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cidr {
    address: Address,
    prefix_len: u8,
}

impl Cidr {
    /// Create an IPv6 CIDR block from the given address and prefix length.
    ///
    /// # Panics
    /// This function panics if the prefix length is larger than 128.
    pub const fn new(address: Address, prefix_len: u8) -> Cidr {
        assert!(prefix_len <= 128);
        Cidr {
            address,
            prefix_len,
        }
    }

    /// Return the address of this IPv6 CIDR block.
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Return the prefix length of this IPv6 CIDR block.
    pub const fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Query whether the subnetwork described by this IPv6 CIDR block contains
    /// the given address.
    pub fn contains_addr(&self, addr: &Address) -> bool {
        self.address.prefix_match_len(addr) >= self.prefix_len
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const PREFIX: Address = Address::new(0xfd00, 0x0db8, 0, 0, 0, 0, 0, 0);

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Address::UNSPECIFIED), "::");
        assert_eq!(format!("{}", Address::REALM_LOCAL_ALL_ROUTERS), "ff03::2");
        assert_eq!(
            format!("{}", Address::new(0xfd00, 0xdb8, 0, 0, 0, 0xff, 0xfe00, 0x5400)),
            "fd00:db8::ff:fe00:5400"
        );
        assert_eq!(
            format!("{}", Address::new(1, 0, 2, 0, 3, 0, 4, 0)),
            "1:0:2:0:3:0:4:0"
        );
        assert_eq!(
            format!("{}", Address::new(1, 0, 0, 2, 0, 0, 0, 3)),
            "1:0:0:2::3"
        );
        assert_eq!(format!("{}", Cidr::new(PREFIX, 64)), "fd00:db8::/64");
    }

    #[test]
    fn test_routing_locator() {
        let prefix = [0xfd, 0x00, 0x0d, 0xb8, 0x00, 0x00, 0x00, 0x00];
        assert_eq!(
            Address::routing_locator(&prefix, 0x5400),
            Address::new(0xfd00, 0x0db8, 0, 0, 0, 0x00ff, 0xfe00, 0x5400)
        );
    }

    #[test]
    fn test_prefix_match_len() {
        let a = Address::new(0xfd00, 0x0db8, 0, 0, 0, 0, 0, 1);
        assert_eq!(a.prefix_match_len(&a), 128);
        assert_eq!(a.prefix_match_len(&PREFIX), 127);
        let b = Address::new(0xfd00, 0x0db9, 0, 0, 0, 0, 0, 1);
        assert_eq!(a.prefix_match_len(&b), 31);
        assert_eq!(a.prefix_match_len(&Address::UNSPECIFIED), 0);
    }

    #[test]
    fn test_cidr_contains() {
        let cidr = Cidr::new(PREFIX, 64);
        assert!(cidr.contains_addr(&Address::new(0xfd00, 0x0db8, 0, 0, 1, 2, 3, 4)));
        assert!(!cidr.contains_addr(&Address::new(0xfd00, 0x0db8, 0, 1, 1, 2, 3, 4)));
        assert!(Cidr::new(PREFIX, 0).contains_addr(&Address::REALM_LOCAL_ALL_ROUTERS));
    }

    #[test]
    fn test_predicates() {
        assert!(Address::REALM_LOCAL_ALL_ROUTERS.is_multicast());
        assert!(!Address::REALM_LOCAL_ALL_ROUTERS.is_unicast());
        assert!(Address::UNSPECIFIED.is_unspecified());
        assert!(PREFIX.is_unicast());
    }
}
