// See https://datatracker.ietf.org/doc/html/rfc8415 for the DHCPv6 specification.

use byteorder::{ByteOrder, NetworkEndian};
use core::borrow::Borrow;
use core::fmt;

use super::{Eui64, Error, Ipv6Address, Result};

pub const SERVER_PORT: u16 = 547;
pub const CLIENT_PORT: u16 = 546;

/// Length of the fixed message header: message type and transaction id.
pub const HEADER_LEN: usize = field::OPTIONS.start;
/// Length of the code and length fields that precede every option payload.
pub const OPTION_HEADER_LEN: usize = field::OPTION_DATA.start;
/// Length of the fixed part of an IA_NA payload (IAID, T1 and T2).
pub const IA_NA_LEN: usize = field::IA_NA_OPTIONS.start;
/// Length of an IA Address payload without nested options.
pub const IA_ADDR_LEN: usize = field::IA_ADDR_OPTIONS.start;
/// Length of a link-layer DUID carrying an EUI-64.
pub const DUID_LL_EUI64_LEN: usize = field::DUID_LL_ADDRESS.start + Eui64::SIZE;

enum_with_unknown! {
    /// The possible message types of a DHCP packet.
    pub enum MessageType(u8) {
        Solicit = 1,
        Advertise = 2,
        Request = 3,
        Confirm = 4,
        Renew = 5,
        Rebind = 6,
        Reply = 7,
        Release = 8,
        Decline = 9,
        Reconfigure = 10,
        InformationRequest = 11,
        RelayForw = 12,
        RelayRepl = 13,
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::Solicit => write!(f, "solicit"),
            Self::Advertise => write!(f, "advertise"),
            Self::Request => write!(f, "request"),
            Self::Confirm => write!(f, "confirm"),
            Self::Renew => write!(f, "renew"),
            Self::Rebind => write!(f, "rebind"),
            Self::Reply => write!(f, "reply"),
            Self::Release => write!(f, "release"),
            Self::Decline => write!(f, "decline"),
            Self::Reconfigure => write!(f, "reconfigure"),
            Self::InformationRequest => write!(f, "information-request"),
            Self::RelayForw => write!(f, "relay-forw"),
            Self::RelayRepl => write!(f, "relay-repl"),
            Self::Unknown(a) => write!(f, "unknown({a})"),
        }
    }
}

enum_with_unknown! {
    /// Option codes the client produces or consumes.
    pub enum OptionCode(u16) {
        ClientId = 1,
        ServerId = 2,
        IaNa = 3,
        IaTa = 4,
        IaAddr = 5,
        Oro = 6,
        Preference = 7,
        ElapsedTime = 8,
        StatusCode = 13,
        RapidCommit = 14,
    }
}

impl fmt::Display for OptionCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::ClientId => write!(f, "client-id"),
            Self::ServerId => write!(f, "server-id"),
            Self::IaNa => write!(f, "ia-na"),
            Self::IaTa => write!(f, "ia-ta"),
            Self::IaAddr => write!(f, "ia-addr"),
            Self::Oro => write!(f, "oro"),
            Self::Preference => write!(f, "preference"),
            Self::ElapsedTime => write!(f, "elapsed-time"),
            Self::StatusCode => write!(f, "status-code"),
            Self::RapidCommit => write!(f, "rapid-commit"),
            Self::Unknown(a) => write!(f, "unknown({a})"),
        }
    }
}

enum_with_unknown! {
    pub enum StatusCode(u16) {
        Success = 0,
        UnspecFail = 1,
        NoAddrsAvail = 2,
        NoBinding = 3,
        NotOnLink = 4,
        UseMulticast = 5,
        NoPrefixAvail = 6
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::Success => write!(f, "success"),
            Self::UnspecFail => write!(f, "unspec-fail"),
            Self::NoAddrsAvail => write!(f, "no-addrs-avail"),
            Self::NoBinding => write!(f, "no-binding"),
            Self::NotOnLink => write!(f, "not-on-link"),
            Self::UseMulticast => write!(f, "use-multicast"),
            Self::NoPrefixAvail => write!(f, "no-prefix-avail"),
            Self::Unknown(a) => write!(f, "unknown({a})"),
        }
    }
}

enum_with_unknown! {
    /// DUID layouts, see RFC 8415 § 11.
    pub enum DuidType(u16) {
        LinkLayerPlusTime = 1,
        Enterprise = 2,
        LinkLayer = 3,
        Uuid = 4,
    }
}

enum_with_unknown! {
    /// IANA hardware types carried in link-layer DUIDs.
    pub enum HardwareType(u16) {
        Ethernet = 1,
        Eui64 = 27,
    }
}

pub(crate) mod field {
    #![allow(non_snake_case)]
    #![allow(unused)]

    use crate::wire::field::*;

    // 0                   1                   2                   3
    // 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |    msg-type   |               transaction-id                  |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // .                            options                            .
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    pub const MTYPE: usize = 0;
    pub const XID: Field = 1..4;
    pub const OPTIONS: Rest = 4..;

    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |          option-code          |           option-len          |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                          option-data                          |
    // |                      (option-len octets)                      |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    pub const OPTION_CODE: Field = 0..2;
    pub const OPTION_LEN: Field = 2..4;
    pub const OPTION_DATA: Rest = 4..;

    // Client and server identifiers carry a DUID: a 2-octet type followed
    // by a type-specific body. Both link-layer flavours start the body
    // with a 2-octet hardware type; DUID-LLT then has a 4-octet time.
    pub const DUID_TYPE: Field = 0..2;
    pub const DUID_HARDWARE_TYPE: Field = 2..4;
    pub const DUID_LL_ADDRESS: Rest = 4..;
    pub const DUID_LLT_TIME: Field = 4..8;

    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                        IAID (4 octets)                        |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                              T1                               |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                              T2                               |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // .                         IA_NA-options                         .
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    pub const IA_NA_IAID: Field = 0..4;
    pub const IA_NA_T1: Field = 4..8;
    pub const IA_NA_T2: Field = 8..12;
    pub const IA_NA_OPTIONS: Rest = 12..;

    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                    IPv6-address (16 octets)                   |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                      preferred-lifetime                       |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                        valid-lifetime                         |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // .                        IAaddr-options                         .
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    pub const IA_ADDR_ADDRESS: Field = 0..16;
    pub const IA_ADDR_PREFERRED_LIFETIME: Field = 16..20;
    pub const IA_ADDR_VALID_LIFETIME: Field = 20..24;
    pub const IA_ADDR_OPTIONS: Rest = 24..;

    pub const STATUS_CODE: Field = 0..2;
    pub const STATUS_MESSAGE: Rest = 2..;

    pub const ELAPSED_TIME: Field = 0..2;
}

/// A representation of a single DHCP option.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Dhcpv6Option<'a> {
    pub kind: OptionCode,
    pub data: &'a [u8],
}

impl<'a> Dhcpv6Option<'a> {
    /// Find the first option of the given kind in an option area.
    pub fn find(buffer: &'a [u8], kind: OptionCode) -> Option<Dhcpv6Option<'a>> {
        let offset = find_option(buffer, 0, buffer.len(), kind)?;
        OptionReader::new(buffer.get(offset..)?).next()
    }
}

/// A cursor over a sequence of options.
///
/// The reader only ever looks at the slice it was created with. It stops,
/// and stays stopped, at the first option whose header or payload does not
/// fit in what is left of that slice.
#[derive(Debug, Clone)]
pub struct OptionReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> OptionReader<'a> {
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Offset of the next option header, relative to the start of the slice.
    pub const fn position(&self) -> usize {
        self.position
    }
}

impl<'a> Iterator for OptionReader<'a> {
    type Item = Dhcpv6Option<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.buffer.get(self.position..)?;
        let header = rest.get(..OPTION_HEADER_LEN)?;
        let kind = NetworkEndian::read_u16(&header[field::OPTION_CODE]);
        let len = NetworkEndian::read_u16(&header[field::OPTION_LEN]) as usize;
        let data = rest.get(OPTION_HEADER_LEN..OPTION_HEADER_LEN + len)?;

        self.position += OPTION_HEADER_LEN + len;
        Some(Dhcpv6Option {
            kind: OptionCode::from(kind),
            data,
        })
    }
}

/// Return the offset of the first option of kind `code` among the options
/// that lie in `buffer[offset..offset + length]`.
///
/// Nothing at or beyond `offset + length` is read, whatever `buffer` holds
/// there. Returns `None` if no option matches before the window is
/// exhausted, if an option header or payload is truncated by the window, or
/// if the window itself does not fit in `buffer`.
pub fn find_option(buffer: &[u8], offset: usize, length: usize, code: OptionCode) -> Option<usize> {
    let window = buffer.get(offset..offset.checked_add(length)?)?;
    let mut reader = OptionReader::new(window);
    loop {
        let position = reader.position();
        if reader.next()?.kind == code {
            return Some(offset + position);
        }
    }
}

/// A buffer for DHCP options.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OptionWriter<'a> {
    /// The underlying buffer, directly from the DHCP packet representation.
    buffer: &'a mut [u8],
}

impl<'a> OptionWriter<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer }
    }

    /// Emit a [`Dhcpv6Option`] into a [`OptionWriter`].
    pub fn emit(&mut self, option: Dhcpv6Option<'_>) -> Result<()> {
        self.emit_header(option.kind, option.data.len())?;
        self.emit_bytes(option.data)
    }

    /// Emit only the code and length of an option. The payload, `len`
    /// octets of it, is written by the calls that follow.
    fn emit_header(&mut self, kind: OptionCode, len: usize) -> Result<()> {
        if len > u16::MAX as usize {
            return Err(Error);
        }
        let mut header = [0; OPTION_HEADER_LEN];
        NetworkEndian::write_u16(&mut header[field::OPTION_CODE], kind.into());
        NetworkEndian::write_u16(&mut header[field::OPTION_LEN], len as u16);
        self.emit_bytes(&header)
    }

    fn emit_bytes(&mut self, data: &[u8]) -> Result<()> {
        if self.buffer.len() < data.len() {
            return Err(Error);
        }
        let (buf, rest) = core::mem::take(&mut self.buffer).split_at_mut(data.len());
        buf.copy_from_slice(data);
        self.buffer = rest;
        Ok(())
    }
}

/// A DUID, as carried by the client and server identifier options.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Duid<'a> {
    pub duid_type: DuidType,
    pub hardware_type: HardwareType,
    /// Everything after the hardware type: the link-layer address for
    /// DUID-LL, the time and then the link-layer address for DUID-LLT.
    pub body: &'a [u8],
}

impl<'a> Duid<'a> {
    /// Parse the payload of an identifier option.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        if data.len() < field::DUID_LL_ADDRESS.start {
            return Err(Error);
        }
        Ok(Self {
            duid_type: DuidType::from(NetworkEndian::read_u16(&data[field::DUID_TYPE])),
            hardware_type: HardwareType::from(NetworkEndian::read_u16(
                &data[field::DUID_HARDWARE_TYPE],
            )),
            body: &data[field::DUID_LL_ADDRESS],
        })
    }

    /// The EUI-64 of a link-layer DUID, if this is one.
    pub fn link_layer_eui64(&self) -> Option<Eui64> {
        match (self.duid_type, self.hardware_type) {
            (DuidType::LinkLayer, HardwareType::Eui64) => Eui64::from_bytes(self.body),
            _ => None,
        }
    }

    /// The DUID-LL payload identifying a node by its EUI-64.
    pub fn link_layer_bytes(eui64: &Eui64) -> [u8; DUID_LL_EUI64_LEN] {
        let mut bytes = [0; DUID_LL_EUI64_LEN];
        NetworkEndian::write_u16(&mut bytes[field::DUID_TYPE], DuidType::LinkLayer.into());
        NetworkEndian::write_u16(
            &mut bytes[field::DUID_HARDWARE_TYPE],
            HardwareType::Eui64.into(),
        );
        bytes[field::DUID_LL_ADDRESS].copy_from_slice(eui64.as_bytes());
        bytes
    }
}

/// The payload of an IA_NA option.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IaNa<'a> {
    pub iaid: u32,
    pub t1: u32,
    pub t2: u32,
    /// The nested options, bounded by the IA_NA option length.
    pub options: &'a [u8],
}

impl<'a> IaNa<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        if data.len() < IA_NA_LEN {
            return Err(Error);
        }
        Ok(Self {
            iaid: NetworkEndian::read_u32(&data[field::IA_NA_IAID]),
            t1: NetworkEndian::read_u32(&data[field::IA_NA_T1]),
            t2: NetworkEndian::read_u32(&data[field::IA_NA_T2]),
            options: &data[field::IA_NA_OPTIONS],
        })
    }
}

/// The payload of an IA Address option.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IaAddress {
    pub address: Ipv6Address,
    pub preferred_lifetime: u32,
    pub valid_lifetime: u32,
}

impl IaAddress {
    /// Parse an IA Address payload. Nested IAaddr-options are not
    /// supported: the payload must be exactly [`IA_ADDR_LEN`] octets.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() != IA_ADDR_LEN {
            return Err(Error);
        }
        Ok(Self {
            address: Ipv6Address::from_bytes(&data[field::IA_ADDR_ADDRESS]),
            preferred_lifetime: NetworkEndian::read_u32(&data[field::IA_ADDR_PREFERRED_LIFETIME]),
            valid_lifetime: NetworkEndian::read_u32(&data[field::IA_ADDR_VALID_LIFETIME]),
        })
    }

    pub fn to_bytes(&self) -> [u8; IA_ADDR_LEN] {
        let mut bytes = [0; IA_ADDR_LEN];
        bytes[field::IA_ADDR_ADDRESS].copy_from_slice(self.address.as_bytes());
        NetworkEndian::write_u32(
            &mut bytes[field::IA_ADDR_PREFERRED_LIFETIME],
            self.preferred_lifetime,
        );
        NetworkEndian::write_u32(&mut bytes[field::IA_ADDR_VALID_LIFETIME], self.valid_lifetime);
        bytes
    }
}

impl fmt::Display for IaAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}(preferred-lifetime={} valid-lifetime={})",
            self.address, self.preferred_lifetime, self.valid_lifetime
        )
    }
}

/// The payload of a Status Code option.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusCodeOption<'a> {
    pub status_code: StatusCode,
    pub status_message: &'a [u8],
}

impl<'a> StatusCodeOption<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        if data.len() < field::STATUS_MESSAGE.start {
            return Err(Error);
        }
        Ok(Self {
            status_code: StatusCode::from(NetworkEndian::read_u16(&data[field::STATUS_CODE])),
            status_message: &data[field::STATUS_MESSAGE],
        })
    }
}

/// A read/write wrapper around a Dynamic Host Configuration Protocol packet buffer.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Packet<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> Packet<T> {
    /// Imbue a raw octet buffer with DHCP packet structure.
    pub const fn new_unchecked(buffer: T) -> Packet<T> {
        Packet { buffer }
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(buffer: T) -> Result<Packet<T>> {
        let packet = Self::new_unchecked(buffer);
        packet.check_len()?;
        Ok(packet)
    }

    /// Ensure that no accessor method will panic if called.
    /// Returns `Err(Error)` if the buffer is too short.
    pub fn check_len(&self) -> Result<()> {
        let len = self.buffer.as_ref().len();
        if len < HEADER_LEN {
            Err(Error)
        } else {
            Ok(())
        }
    }

    /// Returns the message type.
    pub fn message_type(&self) -> MessageType {
        MessageType::from(self.buffer.as_ref()[field::MTYPE])
    }

    /// Returns the transaction ID.
    ///
    /// The transaction ID is a random 24-bit number chosen by the client,
    /// used to associate a reply with the request it answers.
    pub fn transaction_id(&self) -> u32 {
        let field = &self.buffer.as_ref()[field::XID];
        NetworkEndian::read_u24(field)
    }

    /// Return the raw option area.
    #[inline]
    pub fn options_bytes(&self) -> &[u8] {
        &self.buffer.as_ref()[field::OPTIONS]
    }

    /// Return an iterator over the options.
    #[inline]
    pub fn options(&self) -> OptionReader<'_> {
        OptionReader::new(self.options_bytes())
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    /// Sets the message type.
    pub fn set_message_type(&mut self, value: MessageType) {
        let field = &mut self.buffer.as_mut()[field::MTYPE];
        *field = value.into();
    }

    /// Sets the transaction ID. Only the low 24 bits are kept.
    pub fn set_transaction_id(&mut self, value: u32) {
        let value = value & 0xff_ffff;
        let field = &mut self.buffer.as_mut()[field::XID];
        NetworkEndian::write_u24(field, value)
    }

    /// Return a writer over the options.
    #[inline]
    pub fn options_mut(&mut self) -> OptionWriter<'_> {
        OptionWriter::new(&mut self.buffer.as_mut()[field::OPTIONS])
    }
}

impl<T: AsRef<[u8]>> fmt::Display for Packet<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.check_len().is_err() {
            return write!(f, "DHCPv6 ({})", Error);
        }
        write!(
            f,
            "DHCPv6 msg-type={} trans-id={:#08x} options=[",
            self.message_type(),
            self.transaction_id()
        )?;
        for (i, option) in self.options().enumerate() {
            if i != 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", option.kind)?;
        }
        write!(f, "]")
    }
}

/// A high-level representation of a DHCPv6 message.
///
/// It covers the options of the rapid-commit Solicit/Reply exchange. The
/// options are emitted in the order of the fields below. `A` is the list
/// of addresses nested in the IA_NA, see [`ReprIaNa`].
#[derive(Debug, PartialEq, Eq, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Repr<'a, A = &'a [IaAddress]> {
    pub message_type: MessageType,
    /// Note: Only the first 24bits of this ID are actually used
    pub transaction_id: u32,
    /// Seconds since the client began the current exchange.
    pub elapsed_time: Option<u16>,
    /// Raw DUID of the client.
    pub client_id: Option<&'a [u8]>,
    /// Raw DUID of the server.
    pub server_id: Option<&'a [u8]>,
    /// Message-level status.
    pub status_code: Option<StatusCode>,
    pub ia_na: Option<ReprIaNa<A>>,
    pub rapid_commit: bool,
}

impl<'a, A> Repr<'a, A>
where
    A: IntoIterator + Clone,
    A::Item: Borrow<IaAddress>,
{
    /// Return the length of a packet that will be emitted from this high-level representation.
    pub fn buffer_len(&self) -> usize {
        let mut len = HEADER_LEN;

        if self.elapsed_time.is_some() {
            len += OPTION_HEADER_LEN + field::ELAPSED_TIME.end;
        }
        if let Some(id) = self.client_id {
            len += OPTION_HEADER_LEN + id.len();
        }
        if let Some(id) = self.server_id {
            len += OPTION_HEADER_LEN + id.len();
        }
        if self.status_code.is_some() {
            len += OPTION_HEADER_LEN + field::STATUS_CODE.end;
        }
        if let Some(ia) = self.ia_na.as_ref() {
            len += OPTION_HEADER_LEN + ia.data_len();
        }
        if self.rapid_commit {
            len += OPTION_HEADER_LEN;
        }

        len
    }

    /// Emit a high-level representation into a Dynamic Host
    /// Configuration Protocol packet.
    pub fn emit<T>(&self, packet: &mut Packet<T>) -> Result<()>
    where
        T: AsRef<[u8]> + AsMut<[u8]>,
    {
        packet.check_len()?;
        packet.set_message_type(self.message_type);
        packet.set_transaction_id(self.transaction_id);

        let mut options = packet.options_mut();

        if let Some(elapsed_time) = self.elapsed_time {
            options.emit(Dhcpv6Option {
                kind: OptionCode::ElapsedTime,
                data: &elapsed_time.to_be_bytes(),
            })?;
        }
        if let Some(id) = self.client_id {
            options.emit(Dhcpv6Option {
                kind: OptionCode::ClientId,
                data: id,
            })?;
        }
        if let Some(id) = self.server_id {
            options.emit(Dhcpv6Option {
                kind: OptionCode::ServerId,
                data: id,
            })?;
        }
        if let Some(status_code) = self.status_code {
            options.emit(Dhcpv6Option {
                kind: OptionCode::StatusCode,
                data: &u16::from(status_code).to_be_bytes(),
            })?;
        }
        if let Some(ia) = self.ia_na.as_ref() {
            ia.emit(&mut options)?;
        }
        if self.rapid_commit {
            options.emit(Dhcpv6Option {
                kind: OptionCode::RapidCommit,
                data: &[],
            })?;
        }

        Ok(())
    }
}

impl<'a, A> fmt::Display for Repr<'a, A>
where
    A: IntoIterator + Clone,
    A::Item: Borrow<IaAddress>,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "DHCPv6 msg-type={} trans-id={:#08x}",
            self.message_type, self.transaction_id
        )?;
        if let Some(elapsed_time) = self.elapsed_time {
            write!(f, " elapsed-time={elapsed_time}s")?;
        }
        if let Some(client_id) = self.client_id {
            write!(f, " client-id={client_id:02x?}")?;
        }
        if let Some(server_id) = self.server_id {
            write!(f, " server-id={server_id:02x?}")?;
        }
        if let Some(status_code) = self.status_code {
            write!(f, " status={status_code}")?;
        }
        if let Some(ia_na) = self.ia_na.as_ref() {
            write!(f, " {ia_na}")?;
        }
        if self.rapid_commit {
            write!(f, " rapid-commit")?;
        }
        Ok(())
    }
}

/// An IA_NA option and the IA Address options nested in it.
///
/// `addresses` is anything that yields the addresses in order each time it
/// is iterated: a slice, or an iterator that can be cloned.
#[derive(Debug, PartialEq, Eq, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReprIaNa<A> {
    /// The unique identifier for this IA_NA
    pub iaid: u32,
    pub t1: u32,
    pub t2: u32,
    /// One nested IA Address option is emitted per entry.
    pub addresses: A,
    /// Represents a status code applied to this IA
    pub status_code: Option<StatusCode>,
}

impl<A> ReprIaNa<A>
where
    A: IntoIterator + Clone,
    A::Item: Borrow<IaAddress>,
{
    /// Length of the IA_NA payload, nested options included.
    pub fn data_len(&self) -> usize {
        let mut len = IA_NA_LEN;
        len += self.addresses.clone().into_iter().count() * (OPTION_HEADER_LEN + IA_ADDR_LEN);
        if self.status_code.is_some() {
            len += OPTION_HEADER_LEN + field::STATUS_CODE.end;
        }
        len
    }

    pub fn emit(&self, options: &mut OptionWriter<'_>) -> Result<()> {
        options.emit_header(OptionCode::IaNa, self.data_len())?;

        let mut fixed = [0; IA_NA_LEN];
        NetworkEndian::write_u32(&mut fixed[field::IA_NA_IAID], self.iaid);
        NetworkEndian::write_u32(&mut fixed[field::IA_NA_T1], self.t1);
        NetworkEndian::write_u32(&mut fixed[field::IA_NA_T2], self.t2);
        options.emit_bytes(&fixed)?;

        for addr in self.addresses.clone() {
            let addr: &IaAddress = addr.borrow();
            options.emit(Dhcpv6Option {
                kind: OptionCode::IaAddr,
                data: &addr.to_bytes(),
            })?;
        }

        if let Some(status_code) = self.status_code {
            options.emit(Dhcpv6Option {
                kind: OptionCode::StatusCode,
                data: &u16::from(status_code).to_be_bytes(),
            })?;
        }

        Ok(())
    }
}

impl<A> fmt::Display for ReprIaNa<A>
where
    A: IntoIterator + Clone,
    A::Item: Borrow<IaAddress>,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ia-na iaid={} t1={} t2={}", self.iaid, self.t1, self.t2)?;
        for addr in self.addresses.clone() {
            let addr: &IaAddress = addr.borrow();
            write!(f, " addr={addr}")?;
        }
        if let Some(s) = self.status_code {
            write!(f, " status={s}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::{Rng, SeedableRng};

    const EUI64: Eui64 = Eui64([0x18, 0xb4, 0x30, 0x00, 0x00, 0x00, 0x00, 0x01]);
    const PREFIX: Ipv6Address = Ipv6Address::new(0xfd00, 0x0db8, 0, 0, 0, 0, 0, 0);

    static SOLICIT_BYTES: [u8; 74] = [
        0x01, 0x12, 0x34, 0x56, // header
        0x00, 0x08, 0x00, 0x02, 0x00, 0x03, // elapsed time
        0x00, 0x01, 0x00, 0x0c, 0x00, 0x03, 0x00, 0x1b, 0x18, 0xb4, 0x30, 0x00, 0x00, 0x00, 0x00,
        0x01, // client id
        0x00, 0x03, 0x00, 0x28, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, // ia_na
        0x00, 0x05, 0x00, 0x18, 0xfd, 0x00, 0x0d, 0xb8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // ia addr
        0x00, 0x0e, 0x00, 0x00, // rapid commit
    ];

    fn solicit_addresses() -> [IaAddress; 1] {
        [IaAddress {
            address: PREFIX,
            preferred_lifetime: 0,
            valid_lifetime: 0,
        }]
    }

    #[test]
    fn test_emit_solicit() {
        let client_id = Duid::link_layer_bytes(&EUI64);
        let addresses = solicit_addresses();
        let repr = Repr {
            message_type: MessageType::Solicit,
            transaction_id: 0x123456,
            elapsed_time: Some(3),
            client_id: Some(&client_id),
            server_id: None,
            status_code: None,
            ia_na: Some(ReprIaNa {
                iaid: 0,
                t1: 0,
                t2: 0,
                addresses: &addresses,
                status_code: None,
            }),
            rapid_commit: true,
        };
        assert_eq!(repr.buffer_len(), SOLICIT_BYTES.len());

        let mut bytes = vec![0xa5; repr.buffer_len()];
        let mut packet = Packet::new_unchecked(&mut bytes[..]);
        repr.emit(&mut packet).unwrap();
        assert_eq!(&bytes[..], &SOLICIT_BYTES[..]);
    }

    #[test]
    fn test_emit_too_short() {
        let client_id = Duid::link_layer_bytes(&EUI64);
        let repr: Repr = Repr {
            message_type: MessageType::Solicit,
            transaction_id: 1,
            elapsed_time: Some(0),
            client_id: Some(&client_id),
            server_id: None,
            status_code: None,
            ia_na: None,
            rapid_commit: true,
        };
        let mut bytes = vec![0; repr.buffer_len() - 1];
        assert_eq!(repr.emit(&mut Packet::new_unchecked(&mut bytes[..])), Err(Error));

        let mut bytes = [0; 3];
        assert_eq!(repr.emit(&mut Packet::new_unchecked(&mut bytes[..])), Err(Error));
    }

    #[test]
    fn test_parse_header() {
        let packet = Packet::new_checked(&SOLICIT_BYTES[..]).unwrap();
        assert_eq!(packet.message_type(), MessageType::Solicit);
        assert_eq!(packet.transaction_id(), 0x123456);

        let kinds: Vec<OptionCode> = packet.options().map(|o| o.kind).collect();
        assert_eq!(
            kinds,
            vec![
                OptionCode::ElapsedTime,
                OptionCode::ClientId,
                OptionCode::IaNa,
                OptionCode::RapidCommit
            ]
        );

        assert_eq!(Packet::new_checked(&SOLICIT_BYTES[..3]), Err(Error));
    }

    #[test]
    fn test_transaction_id_is_24_bits() {
        let mut bytes = [0; HEADER_LEN];
        let mut packet = Packet::new_unchecked(&mut bytes[..]);
        packet.set_message_type(MessageType::Reply);
        packet.set_transaction_id(0xab_cdef01);
        assert_eq!(packet.transaction_id(), 0xcdef01);
        assert_eq!(bytes, [0x07, 0xcd, 0xef, 0x01]);
    }

    #[test]
    fn test_nested_ia_na() {
        let packet = Packet::new_checked(&SOLICIT_BYTES[..]).unwrap();
        let ia_na = Dhcpv6Option::find(packet.options_bytes(), OptionCode::IaNa).unwrap();
        let ia_na = IaNa::parse(ia_na.data).unwrap();
        assert_eq!((ia_na.iaid, ia_na.t1, ia_na.t2), (0, 0, 0));

        let addresses: Vec<IaAddress> = OptionReader::new(ia_na.options)
            .filter(|o| o.kind == OptionCode::IaAddr)
            .map(|o| IaAddress::parse(o.data).unwrap())
            .collect();
        assert_eq!(addresses, solicit_addresses().to_vec());
    }

    #[test]
    fn test_find_option() {
        let options = &SOLICIT_BYTES[HEADER_LEN..];
        assert_eq!(
            find_option(options, 0, options.len(), OptionCode::ElapsedTime),
            Some(0)
        );
        assert_eq!(
            find_option(options, 0, options.len(), OptionCode::ClientId),
            Some(6)
        );
        assert_eq!(
            find_option(options, 0, options.len(), OptionCode::RapidCommit),
            Some(options.len() - 4)
        );
        assert_eq!(
            find_option(options, 0, options.len(), OptionCode::ServerId),
            None
        );
        // start the scan at the client id
        assert_eq!(
            find_option(options, 6, options.len() - 6, OptionCode::ElapsedTime),
            None
        );
    }

    #[test]
    fn test_find_option_respects_length() {
        let options = &SOLICIT_BYTES[HEADER_LEN..];
        // The rapid commit marker is present in the buffer, but outside the
        // window the caller asked for.
        assert_eq!(
            find_option(options, 0, options.len() - 4, OptionCode::RapidCommit),
            None
        );
        // A window ending in the middle of the client id stops the scan
        // before the options that follow it.
        assert_eq!(find_option(options, 0, 10, OptionCode::IaNa), None);
        assert_eq!(find_option(options, 0, 10, OptionCode::ClientId), None);
    }

    #[test]
    fn test_find_option_truncated_header() {
        let bytes = [0x00, 0x08, 0x00, 0x02, 0x00, 0x03, 0x00, 0x0e, 0x00];
        assert_eq!(find_option(&bytes, 0, bytes.len(), OptionCode::ElapsedTime), Some(0));
        assert_eq!(find_option(&bytes, 0, bytes.len(), OptionCode::RapidCommit), None);
        assert_eq!(find_option(&[], 0, 0, OptionCode::RapidCommit), None);
    }

    #[test]
    fn test_find_option_window_outside_buffer() {
        let bytes = [0x00, 0x0e, 0x00, 0x00];
        assert_eq!(find_option(&bytes, 0, 4, OptionCode::RapidCommit), Some(0));
        assert_eq!(find_option(&bytes, 0, 5, OptionCode::RapidCommit), None);
        assert_eq!(find_option(&bytes, 5, 0, OptionCode::RapidCommit), None);
        assert_eq!(
            find_option(&bytes, usize::MAX, 2, OptionCode::RapidCommit),
            None
        );
    }

    #[test]
    fn test_find_option_never_reads_past_window() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0x6d657368);
        for _ in 0..2000 {
            let len = rng.gen_range(0..64);
            let mut bytes = vec![0u8; len];
            rng.fill(&mut bytes[..]);
            let offset = rng.gen_range(0..=len);
            let length = rng.gen_range(0..=len - offset);
            let code = OptionCode::from(rng.gen_range(0..16u16));

            let found = find_option(&bytes, offset, length, code);

            // The answer must not depend on anything past the window.
            let mut altered = bytes.clone();
            for b in altered[offset + length..].iter_mut() {
                *b = !*b;
            }
            assert_eq!(find_option(&altered, offset, length, code), found);

            if let Some(at) = found {
                assert!(at >= offset);
                let option = OptionReader::new(&bytes[at..offset + length]).next().unwrap();
                assert_eq!(option.kind, code);
            }
        }
    }

    #[test]
    fn test_option_reader_stops_on_truncated_payload() {
        // second option claims 8 octets of payload but only 2 remain
        let bytes = [0x00, 0x0e, 0x00, 0x00, 0x00, 0x08, 0x00, 0x08, 0x00, 0x01];
        let mut reader = OptionReader::new(&bytes);
        assert_eq!(reader.next().map(|o| o.kind), Some(OptionCode::RapidCommit));
        assert_eq!(reader.next(), None);
        assert_eq!(reader.position(), 4);
        assert_eq!(reader.next(), None);
    }

    #[test]
    fn test_duid() {
        let bytes = Duid::link_layer_bytes(&EUI64);
        let duid = Duid::parse(&bytes).unwrap();
        assert_eq!(duid.duid_type, DuidType::LinkLayer);
        assert_eq!(duid.hardware_type, HardwareType::Eui64);
        assert_eq!(duid.link_layer_eui64(), Some(EUI64));

        // DUID-LLT with an Ethernet address
        let llt = [
            0x00, 0x01, 0x00, 0x01, 0x2a, 0x3b, 0x4c, 0x5d, 0x02, 0x00, 0x00, 0x00, 0x00, 0x01,
        ];
        let duid = Duid::parse(&llt).unwrap();
        assert_eq!(duid.duid_type, DuidType::LinkLayerPlusTime);
        assert_eq!(duid.hardware_type, HardwareType::Ethernet);
        assert_eq!(duid.link_layer_eui64(), None);

        assert_eq!(Duid::parse(&[0x00, 0x03, 0x00]), Err(Error));
    }

    #[test]
    fn test_ia_address_exact_length() {
        let addr = IaAddress {
            address: Ipv6Address::new(0xfd00, 0x0db8, 0, 0, 0, 0, 0, 0x1234),
            preferred_lifetime: 3600,
            valid_lifetime: 7200,
        };
        let bytes = addr.to_bytes();
        assert_eq!(IaAddress::parse(&bytes), Ok(addr));
        assert_eq!(IaAddress::parse(&bytes[..23]), Err(Error));

        let mut longer = bytes.to_vec();
        longer.extend_from_slice(&[0x00, 0x0d, 0x00, 0x02, 0x00, 0x00]);
        assert_eq!(IaAddress::parse(&longer), Err(Error));
    }

    #[test]
    fn test_ia_na_too_short() {
        assert_eq!(IaNa::parse(&[0; 11]), Err(Error));
        let ia_na = IaNa::parse(&[0; 12]).unwrap();
        assert!(ia_na.options.is_empty());
    }

    #[test]
    fn test_status_code() {
        let status = StatusCodeOption::parse(&[0x00, 0x02, b'n', b'o']).unwrap();
        assert_eq!(status.status_code, StatusCode::NoAddrsAvail);
        assert_eq!(status.status_message, b"no");
        assert_eq!(
            StatusCodeOption::parse(&[0x00, 0x00]).unwrap().status_code,
            StatusCode::Success
        );
        assert_eq!(StatusCodeOption::parse(&[0x00]), Err(Error));
    }

    #[test]
    fn test_display() {
        let packet = Packet::new_checked(&SOLICIT_BYTES[..]).unwrap();
        assert_eq!(
            format!("{packet}"),
            "DHCPv6 msg-type=solicit trans-id=0x123456 options=[elapsed-time,client-id,ia-na,rapid-commit]"
        );
        assert_eq!(format!("{}", MessageType::from(42)), "unknown(42)");
    }
}
