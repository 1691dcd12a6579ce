//! Drive a DHCPv6 client against an in-process address-assigning agent.
//!
//! Every Solicit the client sends is looped back to a fake agent that
//! assigns `<prefix>::<n>` and answers with a rapid-commit Reply. The clock
//! is virtual, so retransmissions happen instantly.
//!
//!     cargo run --example agent_loopback -- --prefixes 3 --drop 2

use std::collections::VecDeque;
use std::env;
use std::io::Write;
use std::process;

use getopts::Options;
use log::{info, warn, LevelFilter};

use meshdhcp6::iface::{Context, Netif, NetifAddress, OnMeshPrefix};
use meshdhcp6::socket::association::{IdentityAssociation, MAX_IDENTITY_ASSOCIATIONS};
use meshdhcp6::socket::dhcpv6::{Client, ClientConfig, Destination, Event};
use meshdhcp6::socket::{BindError, Endpoint, IpEndpoint, PollAt, SendError};
use meshdhcp6::wire::dhcpv6::{Duid, IaAddress, IaNa, MessageType, OptionCode, Packet, Repr, ReprIaNa};
use meshdhcp6::wire::{Dhcpv6Option, Dhcpv6OptionReader, Eui64, Ipv6Address, Ipv6Cidr};

const NODE_EUI64: Eui64 = Eui64([0x18, 0xb4, 0x30, 0x00, 0x00, 0x00, 0x00, 0x01]);
const AGENT_EUI64: Eui64 = Eui64([0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x54, 0x00]);
const MESH_LOCAL_PREFIX: [u8; 8] = [0xfd, 0xde, 0xad, 0x00, 0xbe, 0xef, 0x00, 0x00];
const AGENT_RLOC16: u16 = 0x5400;

fn setup_logging(filter: &str) {
    env_logger::Builder::new()
        .format(move |buf, record| {
            writeln!(buf, "[{:>5}] {}: {}", record.level(), record.target(), record.args())
        })
        .filter(None, LevelFilter::Trace)
        .parse_filters(filter)
        .parse_env("RUST_LOG")
        .init();
}

#[derive(Debug, Default)]
struct LoopbackEndpoint {
    port: Option<u16>,
    outbox: VecDeque<(IpEndpoint, Vec<u8>)>,
}

impl Endpoint for LoopbackEndpoint {
    fn bind(&mut self, port: u16) -> Result<(), BindError> {
        if self.port.is_some() {
            return Err(BindError::InvalidState);
        }
        self.port = Some(port);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn close(&mut self) {
        self.port = None;
        self.outbox.clear();
    }

    fn send(&mut self, size: usize, remote: IpEndpoint) -> Result<&mut [u8], SendError> {
        if self.port.is_none() {
            return Err(SendError::Unaddressable);
        }
        self.outbox.push_back((remote, vec![0; size]));
        match self.outbox.back_mut() {
            Some((_, buffer)) => Ok(&mut buffer[..]),
            None => Err(SendError::BufferFull),
        }
    }
}

#[derive(Debug, Default)]
struct HostNetif {
    addresses: Vec<NetifAddress>,
}

impl Netif for HostNetif {
    fn add_unicast_address(&mut self, address: &NetifAddress) {
        info!("netif: add {}/{}", address.address, address.prefix_len);
        self.addresses.push(*address);
    }

    fn remove_unicast_address(&mut self, address: &NetifAddress) {
        info!("netif: remove {}", address.address);
        self.addresses.retain(|a| a.address != address.address);
    }
}

struct FakeAgent {
    /// Solicits still to be ignored.
    drop: usize,
    next_host: u16,
    preferred_lifetime: u32,
    valid_lifetime: u32,
}

impl FakeAgent {
    /// Answer a Solicit, or `None` if it is not one or the agent plays dead.
    fn answer(&mut self, solicit: &[u8]) -> Option<Vec<u8>> {
        let packet = Packet::new_checked(solicit).ok()?;
        if packet.message_type() != MessageType::Solicit {
            return None;
        }
        if self.drop > 0 {
            self.drop -= 1;
            warn!("agent: dropping {}", packet);
            return None;
        }
        info!("agent: got {}", packet);

        let options = packet.options_bytes();
        let client_id = Dhcpv6Option::find(options, OptionCode::ClientId)?;
        let ia_na = IaNa::parse(Dhcpv6Option::find(options, OptionCode::IaNa)?.data).ok()?;

        let mut leases = Vec::new();
        for option in Dhcpv6OptionReader::new(ia_na.options) {
            let requested = IaAddress::parse(option.data).ok()?;
            let mut octets = requested.address.0;
            self.next_host += 1;
            octets[14..].copy_from_slice(&self.next_host.to_be_bytes());
            leases.push(IaAddress {
                address: Ipv6Address(octets),
                preferred_lifetime: self.preferred_lifetime,
                valid_lifetime: self.valid_lifetime,
            });
        }

        let server_id = Duid::link_layer_bytes(&AGENT_EUI64);
        let repr = Repr {
            message_type: MessageType::Reply,
            transaction_id: packet.transaction_id(),
            elapsed_time: None,
            client_id: Some(client_id.data),
            server_id: Some(&server_id),
            status_code: None,
            ia_na: Some(ReprIaNa {
                iaid: ia_na.iaid,
                t1: 0,
                t2: 0,
                addresses: &leases[..],
                status_code: None,
            }),
            rapid_commit: true,
        };
        let mut bytes = vec![0; repr.buffer_len()];
        repr.emit(&mut Packet::new_unchecked(&mut bytes[..])).ok()?;
        Some(bytes)
    }
}

fn main() {
    let mut opts = Options::new();
    opts.optopt("n", "prefixes", "number of eligible prefixes (default 2)", "COUNT");
    opts.optopt("", "drop", "solicits the agent ignores first (default 0)", "COUNT");
    opts.optopt("", "seed", "random seed (default 1)", "SEED");
    opts.optopt("", "log", "log filter (default info)", "FILTER");
    opts.optflag("", "multicast", "send to ff03::2 instead of the agent");
    opts.optflag("h", "help", "print this help menu");

    let args: Vec<String> = env::args().collect();
    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1)
        }
    };
    if matches.opt_present("h") {
        print!("{}", opts.usage(&format!("Usage: {} [options]", args[0])));
        process::exit(0)
    }

    let parse = |name: &str, default: u64| -> u64 {
        match matches.opt_str(name).map(|s| s.parse()) {
            None => default,
            Some(Ok(n)) => n,
            Some(Err(e)) => {
                eprintln!("invalid --{name}: {e}");
                process::exit(1)
            }
        }
    };
    let prefix_count = parse("prefixes", 2) as u16;
    let drop = parse("drop", 0) as usize;
    let seed = parse("seed", 1);

    setup_logging(&matches.opt_str("log").unwrap_or_else(|| "info".to_owned()));

    let prefixes: Vec<OnMeshPrefix> = (1..=prefix_count)
        .map(|n| OnMeshPrefix {
            prefix: Ipv6Cidr::new(Ipv6Address::new(0x2001, 0x0db8, 0, n, 0, 0, 0, 0), 64),
            dhcp: true,
            rloc16: AGENT_RLOC16,
        })
        .collect();

    let mut storage = [IdentityAssociation::EMPTY; MAX_IDENTITY_ASSOCIATIONS];
    let mut client = Client::new(LoopbackEndpoint::default(), &mut storage[..]);
    client.set_config(ClientConfig {
        destination: if matches.opt_present("multicast") {
            Destination::RealmLocalAllRouters
        } else {
            Destination::AgentRloc
        },
        ..ClientConfig::default()
    });

    let mut cx = Context::new(NODE_EUI64, MESH_LOCAL_PREFIX, seed);
    let mut netif = HostNetif::default();
    let mut agent = FakeAgent {
        drop,
        next_host: 0,
        preferred_lifetime: 3600,
        valid_lifetime: 7200,
    };

    client.update_addresses(&mut cx, &prefixes[..], &mut netif);

    while client.is_running() {
        match client.poll_at(&cx) {
            PollAt::Now => {}
            PollAt::Time(t) => cx.set_now(t.max(cx.now())),
            PollAt::Ingress => break,
        }
        client.dispatch(&mut cx);

        while let Some((remote, solicit)) = client.endpoint_mut().outbox.pop_front() {
            info!("{}: solicit to {}", cx.now(), remote);
            if let Some(reply) = agent.answer(&solicit) {
                client.process(&mut cx, &mut netif, &reply);
            }
        }

        while let Some(event) = client.poll() {
            match event {
                Event::Configured(address) => info!("{}: configured {}", cx.now(), address.address),
                Event::Deconfigured(address) => {
                    info!("{}: deconfigured {}", cx.now(), address.address)
                }
            }
        }
    }

    info!("{}: client stopped", cx.now());
    for (handle, ia) in client.associations().iter().filter(|(_, ia)| ia.is_valid()) {
        info!(
            "{} {:?} {} preferred {}s valid {}s",
            handle, ia.status, ia.netif_address.address, ia.preferred_lifetime, ia.valid_lifetime
        );
    }

    // The agents withdraw their prefixes.
    let withdrawn: &[OnMeshPrefix] = &[];
    client.update_addresses(&mut cx, withdrawn, &mut netif);
    while let Some(Event::Deconfigured(address)) = client.poll() {
        info!("{}: deconfigured {}", cx.now(), address.address);
    }
    assert!(netif.addresses.is_empty());
}
