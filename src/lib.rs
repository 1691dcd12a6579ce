#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]

//! The _meshdhcp6_ library is a client for stateful DHCPv6 address
//! configuration on constrained mesh nodes, designed for bare-metal,
//! real-time systems without a heap.
//!
//! The client discovers address-assigning agents advertised as eligible
//! on-mesh prefixes in the node's network data, requests one address per
//! prefix with a rapid-commit Solicit, and keeps the installed addresses in
//! step with the set of advertised prefixes.
//!
//! # Layers
//!
//! ## The wire layer
//! The `wire` module deals with the DHCPv6 packet _representation_. It
//! provides a header view over a raw buffer, a bounded option reader that
//! never looks past the length it is given, typed views over the options
//! the client consumes, and a high-level representation that can be
//! emitted into a buffer.
//!
//! ## The interface layer
//! The `iface` module defines the collaborators the client is driven
//! through: the network data that enumerates on-mesh prefixes, the network
//! interface that owns unicast addresses, and the per-call `Context`
//! carrying the clock, the random number generator and node identity.
//!
//! ## The socket layer
//! The `socket` module contains the DHCPv6 `Client` itself, its fixed-size
//! identity association table and its trickle retransmission timer. The
//! client owns a datagram `Endpoint` for its whole lifetime.
//!
//! # Minimum Supported Rust Version (MSRV)
//!
//! This crate is guaranteed to compile on stable Rust 1.65 and up with any
//! valid set of features.

#[cfg(any(feature = "std", feature = "alloc"))]
extern crate alloc;

#[cfg(all(feature = "log", feature = "defmt"))]
compile_error!("You must enable at most one of the following features: defmt, log");

#[macro_use]
mod macros;

pub mod iface;
pub mod rand;
pub mod socket;
pub mod time;
pub mod wire;

#[cfg(test)]
mod tests;
