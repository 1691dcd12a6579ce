#![no_main]
use libfuzzer_sys::fuzz_target;
use meshdhcp6::iface::{Context, Netif, NetifAddress, OnMeshPrefix};
use meshdhcp6::socket::association::IdentityAssociation;
use meshdhcp6::socket::dhcpv6::Client;
use meshdhcp6::socket::{BindError, Endpoint, IpEndpoint, PollAt, SendError};
use meshdhcp6::wire::{Eui64, Ipv6Address, Ipv6Cidr};

struct NullEndpoint {
    open: bool,
    buffer: [u8; 256],
}

impl Endpoint for NullEndpoint {
    fn bind(&mut self, _port: u16) -> Result<(), BindError> {
        self.open = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn send(&mut self, size: usize, _remote: IpEndpoint) -> Result<&mut [u8], SendError> {
        self.buffer.get_mut(..size).ok_or(SendError::BufferFull)
    }
}

struct NullNetif;

impl Netif for NullNetif {
    fn add_unicast_address(&mut self, _address: &NetifAddress) {}
    fn remove_unicast_address(&mut self, _address: &NetifAddress) {}
}

fuzz_target!(|data: &[u8]| {
    let mut storage = [IdentityAssociation::EMPTY; 2];
    let endpoint = NullEndpoint {
        open: false,
        buffer: [0; 256],
    };
    let mut client = Client::new(endpoint, &mut storage[..]);
    let mut cx = Context::new(Eui64([0x18, 0xb4, 0x30, 0, 0, 0, 0, 1]), [0xfd, 0, 0, 0, 0, 0, 0, 0], 1);
    let mut netif = NullNetif;

    let prefixes = [OnMeshPrefix {
        prefix: Ipv6Cidr::new(Ipv6Address::new(0xfd00, 0xdb8, 0, 1, 0, 0, 0, 0), 64),
        dhcp: true,
        rloc16: 0x5400,
    }];
    client.update_addresses(&mut cx, &prefixes[..], &mut netif);
    if let PollAt::Time(t) = client.poll_at(&cx) {
        cx.set_now(t);
    }
    client.dispatch(&mut cx);

    // Let the input reach past the header checks by answering the
    // outstanding transaction.
    let mut payload = data.to_vec();
    if payload.len() >= 4 {
        let xid = client.transaction_id().to_be_bytes();
        payload[0] = 7;
        payload[1..4].copy_from_slice(&xid[1..]);
    }
    let _ = client.process_reply(&mut cx, &mut netif, &payload);
});
