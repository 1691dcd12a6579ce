use core::fmt;

/// An IEEE EUI-64, the globally unique hardware identifier of a node.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Eui64(pub [u8; 8]);

impl Eui64 {
    pub const SIZE: usize = 8;

    /// Construct an EUI-64 from a sequence of octets.
    ///
    /// Returns `None` unless `data` is exactly eight octets long.
    pub fn from_bytes(data: &[u8]) -> Option<Eui64> {
        if data.len() != Self::SIZE {
            return None;
        }
        let mut bytes = [0; Self::SIZE];
        bytes.copy_from_slice(data);
        Some(Eui64(bytes))
    }

    /// Return the identifier as a sequence of octets.
    pub const fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Eui64 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let b = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_bytes() {
        let eui = Eui64::from_bytes(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(eui.as_bytes(), &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(Eui64::from_bytes(&[1, 2, 3]), None);
        assert_eq!(Eui64::from_bytes(&[0; 9]), None);
    }

    #[test]
    fn test_display() {
        let eui = Eui64([0x18, 0xb4, 0x30, 0x00, 0x00, 0x00, 0x00, 0x01]);
        assert_eq!(format!("{eui}"), "18:b4:30:00:00:00:00:01");
    }
}
