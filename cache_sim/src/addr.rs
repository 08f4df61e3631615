use std::fmt::Display;

#[derive(Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// to unify displaying of simulated addresses
pub struct Addr(u32);

impl Addr {
    pub fn new(v: u32) -> Self {
        Self(v)
    }
}

impl Display for Addr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl std::fmt::Debug for Addr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

/// mask of `bits` lower bits. `bits` may be 32.
#[inline]
const fn mask_lower(bits: u32) -> u32 {
    if bits >= u32::BITS {
        u32::MAX
    } else {
        (1 << bits) - 1
    }
}

/// splits addresses into (tag, set, offset) for one cache level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressDecoder {
    offset_bits: u32,
    set_bits: u32,
}

impl AddressDecoder {
    /// `offset_bits + set_bits` must not exceed 32.
    pub const fn new(offset_bits: u32, set_bits: u32) -> Self {
        Self {
            offset_bits,
            set_bits,
        }
    }
    pub fn offset_bits(&self) -> u32 {
        self.offset_bits
    }
    pub fn set_bits(&self) -> u32 {
        self.set_bits
    }
    /// true if the level has a single set.
    pub fn is_fully_associative(&self) -> bool {
        self.set_bits == 0
    }
    #[inline]
    pub fn offset(&self, addr: u32) -> u32 {
        addr & mask_lower(self.offset_bits)
    }
    #[inline]
    pub fn set_index(&self, addr: u32) -> usize {
        (addr.checked_shr(self.offset_bits).unwrap_or(0) & mask_lower(self.set_bits)) as usize
    }
    #[inline]
    pub fn tag(&self, addr: u32) -> u32 {
        addr.checked_shr(self.offset_bits + self.set_bits).unwrap_or(0)
    }
    /// reassembles an address from its parts. inverse of the three accessors above.
    pub fn encode(&self, tag: u32, set: usize, offset: u32) -> u32 {
        let set = (set as u32 & mask_lower(self.set_bits))
            .checked_shl(self.offset_bits)
            .unwrap_or(0);
        let tag = tag.checked_shl(self.offset_bits + self.set_bits).unwrap_or(0);
        tag | set | (offset & mask_lower(self.offset_bits))
    }
}
