#[cfg(feature = "async")]
use core::task::Waker;

use core::fmt;
use heapless::Deque;

use super::association::{AssociationHandle, AssociationSet, IaStatus, IdentityAssociation};
use super::trickle::TrickleTimer;
use super::{Endpoint, IpEndpoint, PollAt};
use crate::iface::{
    AddressFlags, AddressOrigin, Context, Netif, NetifAddress, NetworkData, NetworkDataIterator,
};
use crate::time::{Duration, Instant};
use crate::wire::dhcpv6::{Duid, DuidType, HardwareType, IaAddress, IaNa, OptionCode, StatusCodeOption};
use crate::wire::{
    Dhcpv6MessageType, Dhcpv6Option, Dhcpv6OptionReader, Dhcpv6Packet, Dhcpv6Repr,
    Dhcpv6ReprIaNa, Dhcpv6StatusCode, Ipv6Address, DHCPV6_CLIENT_PORT, DHCPV6_SERVER_PORT,
};

#[cfg(feature = "async")]
use super::WakerRegistration;

/// Events not yet taken by [`Client::poll`]. The oldest is dropped on overflow.
const MAX_EVENTS: usize = 8;

/// Where requests are sent.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Destination {
    /// The realm-local all-routers group, reaching every agent.
    RealmLocalAllRouters,
    /// The routing locator of the agent that advertised the prefix.
    AgentRloc,
}

impl Default for Destination {
    fn default() -> Self {
        if cfg!(feature = "multicast-solicit") {
            Destination::RealmLocalAllRouters
        } else {
            Destination::AgentRloc
        }
    }
}

/// Timer, port and destination configuration.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClientConfig {
    /// Shortest retransmission interval.
    pub trickle_min: Duration,
    /// Longest retransmission interval. Requests are retried at this pace
    /// for as long as the prefix stays eligible.
    pub trickle_max: Duration,
    pub client_port: u16,
    pub server_port: u16,
    pub destination: Destination,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            trickle_min: Duration::from_secs(1),
            trickle_max: Duration::from_secs(120),
            client_port: DHCPV6_CLIENT_PORT,
            server_port: DHCPV6_SERVER_PORT,
            destination: Destination::default(),
        }
    }
}

/// Return value for the `Client::poll` function
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// An address was installed on the interface.
    Configured(NetifAddress),
    /// An address was removed from the interface.
    Deconfigured(NetifAddress),
}

/// Why a received datagram was not accepted as a reply.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReplyError {
    /// Not a reply to the outstanding request: wrong message type, stale
    /// transaction id, or the client is stopped.
    Mismatch,
    /// A reply to the outstanding request that is malformed, reports a
    /// failure, or is addressed to another client.
    Parse,
}

impl fmt::Display for ReplyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReplyError::Mismatch => write!(f, "mismatch"),
            ReplyError::Parse => write!(f, "parse error"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ReplyError {}

/// Stateful DHCPv6 client.
///
/// The client requests one address per eligible on-mesh prefix, one
/// agent at a time, with rapid-commit Solicits paced by a trickle timer.
/// Feed it network data changes with [`update_addresses`], timer ticks
/// with [`dispatch`] and received datagrams with [`process`]. Installed
/// and removed addresses are reported through [`poll`].
///
/// [`update_addresses`]: Client::update_addresses
/// [`dispatch`]: Client::dispatch
/// [`process`]: Client::process
/// [`poll`]: Client::poll
#[derive(Debug)]
pub struct Client<'a, E: Endpoint> {
    endpoint: E,
    associations: AssociationSet<'a>,
    /// The association the outstanding request is for.
    current: Option<AssociationHandle>,
    /// xid of the last sent message.
    transaction_id: u32,
    /// When the current association was first requested.
    start_time: Instant,
    trickle: TrickleTimer,
    config: ClientConfig,
    events: Deque<Event, MAX_EVENTS>,
    /// Eligible prefixes the last update found no free slot for.
    untracked: usize,

    /// Waker registration
    #[cfg(feature = "async")]
    waker: WakerRegistration,
}

impl<'a, E: Endpoint> Client<'a, E> {
    /// Create a stopped client over `endpoint`, tracking at most as many
    /// associations as `storage` has slots.
    pub fn new<S>(endpoint: E, storage: S) -> Self
    where
        S: Into<managed::ManagedSlice<'a, IdentityAssociation>>,
    {
        Client {
            endpoint,
            associations: AssociationSet::new(storage),
            current: None,
            transaction_id: 0,
            start_time: Instant::ZERO,
            trickle: TrickleTimer::new(),
            config: ClientConfig::default(),
            events: Deque::new(),
            untracked: 0,
            #[cfg(feature = "async")]
            waker: WakerRegistration::new(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Set the timer, port and destination configuration.
    ///
    /// Takes effect from the next request cycle.
    pub fn set_config(&mut self, config: ClientConfig) {
        self.config = config;
    }

    /// Set the server/client port
    pub fn set_ports(&mut self, server_port: u16, client_port: u16) {
        self.config.server_port = server_port;
        self.config.client_port = client_port;
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    pub fn endpoint_mut(&mut self) -> &mut E {
        &mut self.endpoint
    }

    /// The identity association table.
    pub fn associations(&self) -> &AssociationSet<'a> {
        &self.associations
    }

    /// The association the outstanding request is for, if any.
    pub fn current(&self) -> Option<AssociationHandle> {
        self.current
    }

    pub fn transaction_id(&self) -> u32 {
        self.transaction_id
    }

    /// Number of eligible prefixes the last [`Client::update_addresses`]
    /// dropped because every association slot was taken.
    pub fn untracked_prefixes(&self) -> usize {
        self.untracked
    }

    /// Whether the client holds its endpoint open.
    pub fn is_running(&self) -> bool {
        self.endpoint.is_open()
    }

    /// Reconcile the association table with the on-mesh prefixes in
    /// `netdata`.
    ///
    /// Associations whose prefix is gone or no longer eligible are
    /// dropped, and their address removed from `netif` if it was
    /// installed. Every eligible prefix without an association gets a free
    /// slot if one is left. The client runs while at least one prefix is
    /// eligible.
    pub fn update_addresses<N, I>(&mut self, cx: &mut Context, netdata: &N, netif: &mut I)
    where
        N: NetworkData + ?Sized,
        I: Netif + ?Sized,
    {
        let mut removed = false;
        for (handle, ia) in self.associations.iter_mut() {
            if !ia.is_valid() || is_eligible(netdata, ia) {
                continue;
            }

            net_debug!("DHCPv6: [{}] prefix {} withdrawn", handle, ia.netif_address.cidr());
            if ia.status == IaStatus::Replied {
                netif.remove_unicast_address(&ia.netif_address);
                enqueue(&mut self.events, Event::Deconfigured(ia.netif_address));
                removed = true;
            }
            ia.reset();
        }
        if removed {
            self.config_changed();
        }

        let mut found = false;
        self.untracked = 0;
        let mut iter = NetworkDataIterator::INIT;
        while let Some(config) = netdata.next_on_mesh_prefix(&mut iter) {
            if !config.dhcp {
                continue;
            }
            found = true;

            let handle = match self.associations.find_matching(&config.prefix) {
                Some(handle) => handle,
                None => match self.associations.claim(&config.prefix, config.rloc16) {
                    Some(handle) => handle,
                    None => {
                        net_debug!(
                            "DHCPv6: no free identity association, dropping prefix {}",
                            config.prefix
                        );
                        self.untracked += 1;
                        continue;
                    }
                },
            };
            self.associations[handle].agent_rloc16 = config.rloc16;
        }

        if found {
            self.start(cx);
        } else {
            self.stop();
        }
    }

    /// Open the endpoint if needed and move on to the next pending
    /// association, unless a request is in flight.
    fn start(&mut self, cx: &mut Context) {
        if !self.endpoint.is_open() {
            if let Err(e) = self.endpoint.bind(self.config.client_port) {
                net_debug!("DHCPv6: cannot bind port {}: {}", self.config.client_port, e);
                return;
            }
            net_trace!("DHCPv6: started");
        }
        self.process_next(cx);
    }

    /// Stop the timer and close the endpoint. Installed addresses stay.
    pub fn stop(&mut self) {
        if self.endpoint.is_open() {
            net_trace!("DHCPv6: stopped");
        }
        self.trickle.stop();
        self.endpoint.close();
        self.current = None;
    }

    /// Pick the first pending association and start a request cycle for
    /// it. Returns `false` if a request is in flight or nothing is pending.
    fn process_next(&mut self, cx: &mut Context) -> bool {
        if let Some(handle) = self.current {
            if self.associations[handle].status == IaStatus::Requesting {
                return false;
            }
        }

        self.trickle.stop();

        let Some(handle) = self.associations.find_status(IaStatus::PendingRequest) else {
            self.current = None;
            return false;
        };

        self.transaction_id = cx.rand().rand_u32() & 0xff_ffff;
        self.current = Some(handle);
        net_trace!(
            "DHCPv6: [{}] new cycle, transaction id {:#08x}",
            handle,
            self.transaction_id
        );

        let now = cx.now();
        self.trickle.start(
            now,
            cx.rand(),
            self.config.trickle_min,
            self.config.trickle_max,
        );
        self.trickle.hear_inconsistent(now, cx.rand());
        true
    }

    /// When the client next needs [`Client::dispatch`].
    pub fn poll_at(&self, cx: &Context) -> PollAt {
        match self.trickle.poll_at() {
            Some(t) if t <= cx.now() => PollAt::Now,
            Some(t) => PollAt::Time(t),
            None => PollAt::Ingress,
        }
    }

    /// Run the retransmission timer.
    pub fn dispatch(&mut self, cx: &mut Context) {
        let now = cx.now();
        if !self.trickle.poll(now, cx.rand()) {
            return;
        }
        if !self.handle_trickle_timer(cx) {
            self.trickle.stop();
        }
    }

    /// Act on the current association. Returns whether the timer should
    /// keep running.
    fn handle_trickle_timer(&mut self, cx: &mut Context) -> bool {
        let Some(handle) = self.current else {
            return false;
        };

        match self.associations[handle].status {
            IaStatus::PendingRequest => {
                self.start_time = cx.now();
                self.associations[handle].status = IaStatus::Requesting;
                self.solicit(cx, handle);
                true
            }
            IaStatus::Requesting => {
                self.solicit(cx, handle);
                true
            }
            IaStatus::Replied | IaStatus::Invalid => {
                self.current = None;
                if self.process_next(cx) {
                    true
                } else {
                    self.stop();
                    false
                }
            }
        }
    }

    /// Send a Solicit for every address still awaiting assignment from the
    /// agent of `handle`.
    fn solicit(&mut self, cx: &mut Context, handle: AssociationHandle) {
        let agent = self.associations[handle].agent_rloc16;
        let addresses = self.associations.iter().filter_map(move |(_, ia)| {
            let requested = ia.agent_rloc16 == agent
                && matches!(ia.status, IaStatus::PendingRequest | IaStatus::Requesting);
            requested.then(|| IaAddress {
                address: ia.netif_address.address,
                preferred_lifetime: 0,
                valid_lifetime: 0,
            })
        });
        let count = addresses.clone().count();

        let elapsed = (cx.now() - self.start_time).secs();
        let client_id = Duid::link_layer_bytes(&cx.eui64());
        let repr = Dhcpv6Repr {
            message_type: Dhcpv6MessageType::Solicit,
            transaction_id: self.transaction_id,
            elapsed_time: Some(elapsed.min(u16::MAX as u64) as u16),
            client_id: Some(&client_id),
            server_id: None,
            status_code: None,
            ia_na: Some(Dhcpv6ReprIaNa {
                iaid: 0,
                t1: 0,
                t2: 0,
                addresses,
                status_code: None,
            }),
            rapid_commit: true,
        };

        let addr = match self.config.destination {
            Destination::RealmLocalAllRouters => Ipv6Address::REALM_LOCAL_ALL_ROUTERS,
            Destination::AgentRloc => Ipv6Address::routing_locator(cx.mesh_local_prefix(), agent),
        };
        let remote = IpEndpoint::new(addr, self.config.server_port);

        match self.endpoint.send(repr.buffer_len(), remote) {
            Ok(buffer) => {
                let mut packet = Dhcpv6Packet::new_unchecked(buffer);
                match repr.emit(&mut packet) {
                    Ok(()) => net_trace!(
                        "DHCPv6: [{}] solicit for {} addresses to {}",
                        handle,
                        count,
                        remote
                    ),
                    Err(e) => net_debug!("DHCPv6: cannot emit solicit: {}", e),
                }
            }
            Err(e) => net_debug!("DHCPv6: cannot send solicit to {}: {}", remote, e),
        }
    }

    /// Handle a datagram received on the client port.
    pub fn process<I>(&mut self, cx: &mut Context, netif: &mut I, payload: &[u8])
    where
        I: Netif + ?Sized,
    {
        match self.process_reply(cx, netif, payload) {
            Ok(()) | Err(ReplyError::Mismatch) => {}
            Err(e) => net_debug!("DHCPv6: ignoring reply: {}", e),
        }
    }

    /// Validate a reply to the outstanding request and apply the addresses
    /// it assigns.
    ///
    /// Checks run in order and the first failure aborts. Addresses applied
    /// before a malformed IA Address option stay applied.
    pub fn process_reply<I>(
        &mut self,
        cx: &mut Context,
        netif: &mut I,
        payload: &[u8],
    ) -> Result<(), ReplyError>
    where
        I: Netif + ?Sized,
    {
        let packet = Dhcpv6Packet::new_checked(payload).map_err(|_| ReplyError::Parse)?;
        if packet.message_type() != Dhcpv6MessageType::Reply
            || packet.transaction_id() != self.transaction_id
            || !self.is_running()
        {
            net_trace!("DHCPv6: ignoring {}", packet);
            return Err(ReplyError::Mismatch);
        }

        let options = packet.options_bytes();

        if let Some(option) = Dhcpv6Option::find(options, OptionCode::StatusCode) {
            check_status(option)?;
        }

        let server_id =
            Dhcpv6Option::find(options, OptionCode::ServerId).ok_or(ReplyError::Parse)?;
        let duid = Duid::parse(server_id.data).map_err(|_| ReplyError::Parse)?;
        match (duid.duid_type, duid.hardware_type) {
            (DuidType::LinkLayerPlusTime, HardwareType::Ethernet) => {}
            _ if duid.link_layer_eui64().is_some() => {}
            _ => return Err(ReplyError::Parse),
        }

        let client_id =
            Dhcpv6Option::find(options, OptionCode::ClientId).ok_or(ReplyError::Parse)?;
        if client_id.data != Duid::link_layer_bytes(&cx.eui64()) {
            return Err(ReplyError::Parse);
        }

        Dhcpv6Option::find(options, OptionCode::RapidCommit).ok_or(ReplyError::Parse)?;

        let ia_na = Dhcpv6Option::find(options, OptionCode::IaNa).ok_or(ReplyError::Parse)?;
        let ia_na = IaNa::parse(ia_na.data).map_err(|_| ReplyError::Parse)?;

        if let Some(option) = Dhcpv6Option::find(ia_na.options, OptionCode::StatusCode) {
            check_status(option)?;
        }

        for option in Dhcpv6OptionReader::new(ia_na.options) {
            if option.kind != OptionCode::IaAddr {
                continue;
            }
            let address = IaAddress::parse(option.data).map_err(|_| ReplyError::Parse)?;
            self.apply_address(netif, &address);
        }

        if !self.handle_trickle_timer(cx) {
            self.trickle.stop();
        }
        Ok(())
    }

    /// Commit an assigned address to the first association awaiting one in
    /// a prefix that covers it. An address nobody awaits is ignored.
    fn apply_address<I>(&mut self, netif: &mut I, address: &IaAddress)
    where
        I: Netif + ?Sized,
    {
        let Some((handle, ia)) = self
            .associations
            .iter_mut()
            .find(|(_, ia)| ia.is_valid() && ia.valid_lifetime == 0 && ia.covers(&address.address))
        else {
            net_debug!("DHCPv6: no association awaits {}", address.address);
            return;
        };

        ia.netif_address.address = address.address;
        ia.netif_address.origin = AddressOrigin::Dhcpv6;
        ia.netif_address.flags =
            AddressFlags::from_lifetimes(address.preferred_lifetime, address.valid_lifetime);
        ia.preferred_lifetime = address.preferred_lifetime;
        ia.valid_lifetime = address.valid_lifetime;
        ia.status = IaStatus::Replied;

        net_debug!("DHCPv6: [{}] assigned {}", handle, address);
        netif.add_unicast_address(&ia.netif_address);
        let netif_address = ia.netif_address;

        enqueue(&mut self.events, Event::Configured(netif_address));
        self.config_changed();
    }

    /// Take the next address change, if any.
    pub fn poll(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    fn config_changed(&mut self) {
        #[cfg(feature = "async")]
        self.waker.wake_all();
    }

    /// Register a waker.
    ///
    /// The waker is woken on state changes that might affect the return value
    /// of `poll` method calls, which indicates an address was installed or
    /// removed by this client.
    ///
    /// Notes:
    ///
    /// - Only one waker can be registered at a time. If another waker was previously registered,
    ///   it is overwritten and will no longer be woken.
    /// - The Waker is woken only once. Once woken, you must register it again to receive more wakes.
    #[cfg(feature = "async")]
    pub fn register_waker(&mut self, waker: &Waker) {
        self.waker.register(waker)
    }

    /// Adds another waker.
    ///
    /// - The Waker is woken only once. Once woken, you must register it again to receive more wakes.
    #[cfg(feature = "async")]
    pub fn add_waker(&mut self, waker: &Waker) {
        self.waker.add(waker)
    }

    /// Clears all the wakers that were assigned to this client
    #[cfg(feature = "async")]
    pub fn clear_waker(&mut self) {
        self.waker.clear();
    }
}

fn is_eligible<N>(netdata: &N, ia: &IdentityAssociation) -> bool
where
    N: NetworkData + ?Sized,
{
    let mut iter = NetworkDataIterator::INIT;
    while let Some(config) = netdata.next_on_mesh_prefix(&mut iter) {
        if config.dhcp && ia.matches_prefix(&config.prefix) {
            return true;
        }
    }
    false
}

fn check_status(option: Dhcpv6Option<'_>) -> Result<(), ReplyError> {
    let status = StatusCodeOption::parse(option.data).map_err(|_| ReplyError::Parse)?;
    if status.status_code != Dhcpv6StatusCode::Success {
        net_debug!("DHCPv6: reply status {}", status.status_code);
        return Err(ReplyError::Parse);
    }
    Ok(())
}

fn enqueue(events: &mut Deque<Event, MAX_EVENTS>, event: Event) {
    if events.is_full() {
        events.pop_front();
    }
    let _ = events.push_back(event);
}
