use core::fmt;
use core::ops::{Index, IndexMut};
use managed::ManagedSlice;

use crate::iface::{AddressOrigin, NetifAddress};
use crate::wire::{Ipv6Address, Ipv6Cidr};

/// Conventional number of identity associations a client tracks.
pub const MAX_IDENTITY_ASSOCIATIONS: usize = 4;

/// Progress of one address request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IaStatus {
    /// The slot is free.
    #[default]
    Invalid,
    /// An eligible prefix was seen, no request went out yet.
    PendingRequest,
    /// A request is in flight. At most one slot is in this state.
    Requesting,
    /// The agent assigned an address.
    Replied,
}

/// One slot of the identity association table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IdentityAssociation {
    /// The prefix while a request is pending, the assigned address once
    /// replied.
    pub netif_address: NetifAddress,
    pub status: IaStatus,
    /// Short address of the agent that advertised the prefix.
    pub agent_rloc16: u16,
    pub preferred_lifetime: u32,
    pub valid_lifetime: u32,
}

impl IdentityAssociation {
    pub const EMPTY: Self = IdentityAssociation {
        netif_address: NetifAddress::EMPTY,
        status: IaStatus::Invalid,
        agent_rloc16: 0,
        preferred_lifetime: 0,
        valid_lifetime: 0,
    };

    pub fn is_valid(&self) -> bool {
        self.status != IaStatus::Invalid
    }

    /// Whether the stored address lies in `prefix` with the same prefix length.
    pub fn matches_prefix(&self, prefix: &Ipv6Cidr) -> bool {
        self.netif_address.prefix_len == prefix.prefix_len()
            && prefix.contains_addr(&self.netif_address.address)
    }

    /// Whether this slot's prefix covers `address`.
    pub fn covers(&self, address: &Ipv6Address) -> bool {
        self.netif_address.cidr().contains_addr(address)
    }

    /// Start tracking `prefix` for the agent `rloc16`.
    pub(crate) fn claim(&mut self, prefix: &Ipv6Cidr, rloc16: u16) {
        *self = IdentityAssociation {
            netif_address: NetifAddress {
                address: prefix.address(),
                prefix_len: prefix.prefix_len(),
                origin: AddressOrigin::Dhcpv6,
                ..NetifAddress::EMPTY
            },
            status: IaStatus::PendingRequest,
            agent_rloc16: rloc16,
            preferred_lifetime: 0,
            valid_lifetime: 0,
        };
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::EMPTY;
    }
}

/// A handle, identifying a slot of an [AssociationSet].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AssociationHandle(usize);

impl fmt::Display for AssociationHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A fixed-capacity table of identity associations.
///
/// The table is never grown: the storage handed to [AssociationSet::new]
/// decides its capacity, even when that storage is a `Vec`.
#[derive(Debug)]
pub struct AssociationSet<'a> {
    slots: ManagedSlice<'a, IdentityAssociation>,
}

impl<'a> AssociationSet<'a> {
    /// Create a table using the provided storage. All slots are reset.
    pub fn new<SlotsT>(slots: SlotsT) -> AssociationSet<'a>
    where
        SlotsT: Into<ManagedSlice<'a, IdentityAssociation>>,
    {
        let mut slots = slots.into();
        for slot in slots.iter_mut() {
            slot.reset();
        }
        AssociationSet { slots }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Find the slot tracking `prefix`.
    pub fn find_matching(&self, prefix: &Ipv6Cidr) -> Option<AssociationHandle> {
        self.iter()
            .find(|(_, ia)| ia.is_valid() && ia.matches_prefix(prefix))
            .map(|(handle, _)| handle)
    }

    /// Find the first slot in the given status.
    pub fn find_status(&self, status: IaStatus) -> Option<AssociationHandle> {
        self.iter()
            .find(|(_, ia)| ia.status == status)
            .map(|(handle, _)| handle)
    }

    /// Claim the first free slot for `prefix`, or return `None` if the
    /// table is full.
    pub fn claim(&mut self, prefix: &Ipv6Cidr, rloc16: u16) -> Option<AssociationHandle> {
        let handle = self.find_status(IaStatus::Invalid)?;
        net_trace!("[{}]: claiming for {}", handle, prefix);
        self.slots[handle.0].claim(prefix, rloc16);
        Some(handle)
    }

    pub fn get(&self, handle: AssociationHandle) -> Option<&IdentityAssociation> {
        self.slots.get(handle.0)
    }

    pub fn get_mut(&mut self, handle: AssociationHandle) -> Option<&mut IdentityAssociation> {
        self.slots.get_mut(handle.0)
    }

    /// Iterate every slot with its handle, free ones included.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (AssociationHandle, &IdentityAssociation)> + Clone + '_ {
        self.slots
            .iter()
            .enumerate()
            .map(|(n, ia)| (AssociationHandle(n), ia))
    }

    pub fn iter_mut(
        &mut self,
    ) -> impl Iterator<Item = (AssociationHandle, &mut IdentityAssociation)> + '_ {
        self.slots
            .iter_mut()
            .enumerate()
            .map(|(n, ia)| (AssociationHandle(n), ia))
    }

    /// Number of slots currently tracking a prefix.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|ia| ia.is_valid()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a> Index<AssociationHandle> for AssociationSet<'a> {
    type Output = IdentityAssociation;

    fn index(&self, handle: AssociationHandle) -> &IdentityAssociation {
        &self.slots[handle.0]
    }
}

impl<'a> IndexMut<AssociationHandle> for AssociationSet<'a> {
    fn index_mut(&mut self, handle: AssociationHandle) -> &mut IdentityAssociation {
        &mut self.slots[handle.0]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn prefix(n: u16) -> Ipv6Cidr {
        Ipv6Cidr::new(Ipv6Address::new(0xfd00, n, 0, 0, 0, 0, 0, 0), 64)
    }

    #[test]
    fn test_claim_until_full() {
        let mut storage = [IdentityAssociation::EMPTY; 2];
        let mut set = AssociationSet::new(&mut storage[..]);
        assert_eq!(set.capacity(), 2);
        assert!(set.is_empty());

        let a = set.claim(&prefix(1), 0x5400).unwrap();
        let b = set.claim(&prefix(2), 0x5800).unwrap();
        assert_ne!(a, b);
        assert_eq!(set.claim(&prefix(3), 0x5c00), None);
        assert_eq!(set.len(), 2);

        assert_eq!(set[a].status, IaStatus::PendingRequest);
        assert_eq!(set[a].agent_rloc16, 0x5400);
        assert_eq!(set[a].netif_address.origin, AddressOrigin::Dhcpv6);
        assert_eq!(set[b].valid_lifetime, 0);
    }

    #[test]
    fn test_find_matching() {
        let mut storage = [IdentityAssociation::EMPTY; 2];
        let mut set = AssociationSet::new(&mut storage[..]);
        let a = set.claim(&prefix(1), 0x5400).unwrap();

        assert_eq!(set.find_matching(&prefix(1)), Some(a));
        assert_eq!(set.find_matching(&prefix(2)), None);
        // same address, different length
        let shorter = Ipv6Cidr::new(prefix(1).address(), 48);
        assert_eq!(set.find_matching(&shorter), None);

        set[a].reset();
        assert_eq!(set.find_matching(&prefix(1)), None);
        assert_eq!(set.find_status(IaStatus::Invalid), Some(a));
    }

    #[test]
    fn test_matches_assigned_address() {
        let mut ia = IdentityAssociation::EMPTY;
        ia.claim(&prefix(1), 0x5400);
        ia.netif_address.address = Ipv6Address::new(0xfd00, 1, 0, 0, 0, 0, 0, 0x1234);
        assert!(ia.matches_prefix(&prefix(1)));
        assert!(ia.covers(&Ipv6Address::new(0xfd00, 1, 0, 0, 1, 2, 3, 4)));
        assert!(!ia.covers(&Ipv6Address::new(0xfd00, 2, 0, 0, 1, 2, 3, 4)));
    }

    #[test]
    fn test_new_resets_storage() {
        let mut storage = [IdentityAssociation::EMPTY; 1];
        storage[0].status = IaStatus::Replied;
        let set = AssociationSet::new(&mut storage[..]);
        assert!(set.is_empty());
    }

    #[test]
    fn test_handle_display() {
        assert_eq!(format!("{}", AssociationHandle(3)), "#3");
    }
}
