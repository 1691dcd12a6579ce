/*! Low-level packet access and construction.

The `wire` module deals with the packet *representation*. It provides two
levels of functionality.

 * First, it provides functions to extract fields from sequences of octets,
   and to insert fields into sequences of octets. This happens `Packet`
   family of structures, e.g. [Dhcpv6Packet], and the option readers and
   writers that walk the option area of a packet.
 * Second, in cases where the space of valid field values is much smaller
   than the space of possible field values, it provides a compact,
   high-level representation of packet data that can be parsed from and
   emitted into a sequence of octets. This happens through the `Repr`
   family of structs and enums, e.g. [Dhcpv6Repr].

The functions in the `wire` module are designed for use together with
`-Cpanic=abort`: nothing that reads peer-controlled lengths indexes past
the bounds it was handed. Every such step returns `Result` or `Option`
and fails closed.

[Dhcpv6Packet]: struct.Dhcpv6Packet.html
[Dhcpv6Repr]: struct.Dhcpv6Repr.html
*/

mod field {
    pub type Field = ::core::ops::Range<usize>;
    pub type Rest = ::core::ops::RangeFrom<usize>;
}

pub mod dhcpv6;
mod eui64;
pub mod ipv6;

use core::fmt;

pub use self::eui64::Eui64;

pub use self::ipv6::{Address as Ipv6Address, Cidr as Ipv6Cidr};

pub use self::dhcpv6::{
    find_option as dhcpv6_find_option, Dhcpv6Option, MessageType as Dhcpv6MessageType,
    OptionCode as Dhcpv6OptionCode, OptionReader as Dhcpv6OptionReader, OptionWriter as Dhcpv6OptionWriter,
    Packet as Dhcpv6Packet, Repr as Dhcpv6Repr, ReprIaNa as Dhcpv6ReprIaNa,
    StatusCode as Dhcpv6StatusCode, CLIENT_PORT as DHCPV6_CLIENT_PORT,
    SERVER_PORT as DHCPV6_SERVER_PORT,
};

/// Parsing a packet failed.
///
/// Either it is malformed, or it is not supported by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Error;

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "wire::Error")
    }
}

pub type Result<T> = core::result::Result<T, Error>;
