/*! Communication between the client and the network.

The `socket` module holds the DHCPv6 [Client](dhcpv6::Client), the
[identity association table](association) it maintains and the
[trickle timer](trickle) that paces its retransmissions. Datagrams leave
and enter through an [Endpoint] the client owns for its whole lifetime.
*/

use core::fmt;

use crate::time::Instant;
use crate::wire::Ipv6Address;

pub mod association;
pub mod dhcpv6;
pub mod trickle;

#[cfg(feature = "async")]
mod waker;

#[cfg(feature = "async")]
pub(crate) use self::waker::WakerRegistration;

/// Gives an indication on the next time the client should be polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollAt {
    /// The client needs to be polled immediately.
    Now,
    /// The client needs to be polled at given [Instant][struct.Instant].
    Time(Instant),
    /// The client does not need to be polled unless there are external changes.
    Ingress,
}

/// An internet endpoint address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IpEndpoint {
    pub addr: Ipv6Address,
    pub port: u16,
}

impl IpEndpoint {
    pub const fn new(addr: Ipv6Address, port: u16) -> IpEndpoint {
        IpEndpoint { addr, port }
    }
}

impl fmt::Display for IpEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}]:{}", self.addr, self.port)
    }
}

/// Error returned by [`Endpoint::bind`]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BindError {
    InvalidState,
    Unaddressable,
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BindError::InvalidState => write!(f, "invalid state"),
            BindError::Unaddressable => write!(f, "unaddressable"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BindError {}

/// Error returned by [`Endpoint::send`]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendError {
    Unaddressable,
    BufferFull,
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SendError::Unaddressable => write!(f, "unaddressable"),
            SendError::BufferFull => write!(f, "buffer full"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SendError {}

/// A datagram endpoint.
///
/// The client opens it by binding, sends through it while it has work to
/// do and closes it when it stops. Received datagrams are handed to
/// [`Client::process`](dhcpv6::Client::process) by the driver.
pub trait Endpoint {
    /// Bind to the given local port, opening the endpoint.
    fn bind(&mut self, port: u16) -> Result<(), BindError>;

    /// Whether the endpoint is bound.
    fn is_open(&self) -> bool;

    /// Close the endpoint. Pending outbound datagrams may be dropped.
    fn close(&mut self);

    /// Enqueue a datagram of `size` octets for `remote`, returning the
    /// buffer to fill in.
    fn send(&mut self, size: usize, remote: IpEndpoint) -> Result<&mut [u8], SendError>;
}
