use std::fmt::Display;

/// The wire byte of the robot with table index zero. All other IDs follow contiguously.
pub const ID_BASE: u8 = b'A';

/// A robot identifier as it travels over the broadcast medium: a single byte offset from [`ID_BASE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(u8);

impl PeerId {
    /// Marks an empty packet. Packets carrying it are never processed.
    pub const NULL: PeerId = PeerId(0);

    /// Written in the initiator field to address everyone in range.
    pub const BROADCAST: PeerId = PeerId(ID_BASE);

    pub const fn from_byte(byte: u8) -> Self {
        PeerId(byte)
    }

    /// The ID of the robot owning table slot `index`, if it fits in a byte.
    pub fn from_index(index: usize) -> Option<Self> {
        u8::try_from(index)
            .ok()
            .and_then(|i| ID_BASE.checked_add(i))
            .map(PeerId)
    }

    pub fn from_char(c: char) -> Option<Self> {
        u8::try_from(c).ok().map(PeerId)
    }

    pub fn byte(self) -> u8 {
        self.0
    }

    pub fn is_null(self) -> bool {
        self == Self::NULL
    }

    /// The table slot of this ID. Bounds against the table size are checked by the table.
    pub fn index(self) -> Option<usize> {
        self.0.checked_sub(ID_BASE).map(usize::from)
    }
}

impl Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_ascii_graphic() {
            write!(f, "{}", self.0 as char)
        } else {
            write!(f, "#{}", self.0)
        }
    }
}
