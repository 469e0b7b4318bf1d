//! Command codes for the qctl verb family.
//!
//! A command code packs four fields into a `u32`, using the Linux ioctl
//! layout:
//!
//! ```text
//!  31 30 29            16 15        8 7          0
//! +-----+----------------+-----------+------------+
//! | dir |      size      |   magic   |     nr     |
//! +-----+----------------+-----------+------------+
//! ```
//!
//! `dir` says which way the payload behind the argument flows, from the
//! caller's point of view: [`Direction::WRITE`] means caller -> store,
//! [`Direction::READ`] means store -> caller.

use std::fmt;

use crate::constants::{COMMAND_MAGIC, INT_PAYLOAD_LEN, MAX_COMMAND_NR, SNAPSHOT_LEN};

const NR_BITS: u32 = 8;
const MAGIC_BITS: u32 = 8;
const SIZE_BITS: u32 = 14;

const NR_SHIFT: u32 = 0;
const MAGIC_SHIFT: u32 = NR_SHIFT + NR_BITS;
const SIZE_SHIFT: u32 = MAGIC_SHIFT + MAGIC_BITS;
const DIR_SHIFT: u32 = SIZE_SHIFT + SIZE_BITS;

const NR_MASK: u32 = (1 << NR_BITS) - 1;
const MAGIC_MASK: u32 = (1 << MAGIC_BITS) - 1;
const SIZE_MASK: u32 = (1 << SIZE_BITS) - 1;
const DIR_MASK: u32 = 0b11;

/// Payload direction bits of a command code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Direction(u8);

impl Direction {
    /// No payload behind the argument.
    pub const NONE: Direction = Direction(0);
    /// Caller -> store: the endpoint reads caller memory.
    pub const WRITE: Direction = Direction(1);
    /// Store -> caller: the endpoint writes caller memory.
    pub const READ: Direction = Direction(2);
    /// Both ways.
    pub const READ_WRITE: Direction = Direction(3);

    pub const fn from_bits(bits: u8) -> Direction {
        Direction(bits & DIR_MASK as u8)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    /// Does the endpoint write into caller memory?
    pub fn writes_caller(self) -> bool {
        self.0 & Self::READ.0 != 0
    }

    /// Does the endpoint read from caller memory?
    pub fn reads_caller(self) -> bool {
        self.0 & Self::WRITE.0 != 0
    }
}

/// A raw command code as carried on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandCode(pub u32);

impl CommandCode {
    /// Pack a command code from its fields.
    pub const fn new(dir: Direction, magic: u8, nr: u8, size: u16) -> Self {
        CommandCode(
            ((dir.0 as u32 & DIR_MASK) << DIR_SHIFT)
                | ((size as u32 & SIZE_MASK) << SIZE_SHIFT)
                | ((magic as u32) << MAGIC_SHIFT)
                | ((nr as u32) << NR_SHIFT),
        )
    }

    pub fn direction(self) -> Direction {
        Direction(((self.0 >> DIR_SHIFT) & DIR_MASK) as u8)
    }

    pub fn size(self) -> usize {
        ((self.0 >> SIZE_SHIFT) & SIZE_MASK) as usize
    }

    pub fn magic(self) -> u8 {
        ((self.0 >> MAGIC_SHIFT) & MAGIC_MASK) as u8
    }

    pub fn nr(self) -> u8 {
        ((self.0 >> NR_SHIFT) & NR_MASK) as u8
    }

    /// True if the family tag and number are in range. Says nothing about
    /// whether direction and size match a known verb.
    pub fn in_family(self) -> bool {
        self.magic() == COMMAND_MAGIC && self.nr() <= MAX_COMMAND_NR
    }
}

impl fmt::Debug for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandCode")
            .field("raw", &format_args!("{:#010x}", self.0))
            .field("dir", &self.direction().bits())
            .field("magic", &self.magic())
            .field("nr", &self.nr())
            .field("size", &self.size())
            .finish()
    }
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// The fixed administrative verb set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Restore the compile-time default quantum.
    Reset,
    /// Argument points to the new value.
    SetFromPointer,
    /// Argument is the new value.
    TellValue,
    /// Argument points to where the current value goes.
    GetToPointer,
    /// Current value comes back as the result code.
    QueryValue,
    /// Argument points to the new value; the old one is written back there.
    ExchangeFromPointer,
    /// Argument is the new value; the old one comes back as the result code.
    ShiftValue,
    /// Record the caller in the ledger and return its snapshot.
    Register,
}

impl Verb {
    pub const ALL: [Verb; 8] = [
        Verb::Reset,
        Verb::SetFromPointer,
        Verb::TellValue,
        Verb::GetToPointer,
        Verb::QueryValue,
        Verb::ExchangeFromPointer,
        Verb::ShiftValue,
        Verb::Register,
    ];

    /// The wire code for this verb.
    pub const fn code(self) -> CommandCode {
        const INT: u16 = INT_PAYLOAD_LEN as u16;
        const SNAP: u16 = SNAPSHOT_LEN as u16;
        match self {
            Verb::Reset => CommandCode::new(Direction::NONE, COMMAND_MAGIC, 0, 0),
            Verb::SetFromPointer => CommandCode::new(Direction::WRITE, COMMAND_MAGIC, 1, INT),
            Verb::TellValue => CommandCode::new(Direction::NONE, COMMAND_MAGIC, 2, 0),
            Verb::GetToPointer => CommandCode::new(Direction::READ, COMMAND_MAGIC, 3, INT),
            Verb::QueryValue => CommandCode::new(Direction::NONE, COMMAND_MAGIC, 4, 0),
            Verb::ExchangeFromPointer => {
                CommandCode::new(Direction::READ_WRITE, COMMAND_MAGIC, 5, INT)
            }
            Verb::ShiftValue => CommandCode::new(Direction::NONE, COMMAND_MAGIC, 6, 0),
            Verb::Register => CommandCode::new(Direction::READ, COMMAND_MAGIC, 7, SNAP),
        }
    }

    /// Look up the verb with exactly this code.
    pub fn from_code(code: CommandCode) -> Option<Verb> {
        Verb::ALL.into_iter().find(|verb| verb.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            Verb::Reset => "reset",
            Verb::SetFromPointer => "set",
            Verb::TellValue => "tell",
            Verb::GetToPointer => "get",
            Verb::QueryValue => "query",
            Verb::ExchangeFromPointer => "exchange",
            Verb::ShiftValue => "shift",
            Verb::Register => "register",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn fields_unpack() {
        let code = Verb::Register.code();
        assert_eq!(code.magic(), COMMAND_MAGIC);
        assert_eq!(code.nr(), 7);
        assert_eq!(code.size(), SNAPSHOT_LEN);
        assert_eq!(code.direction(), Direction::READ);
    }

    #[test]
    fn linux_layout() {
        // _IOR('k', 3, int) on Linux
        assert_eq!(Verb::GetToPointer.code().0, 0x8004_6b03);
        // _IOW('k', 1, int)
        assert_eq!(Verb::SetFromPointer.code().0, 0x4004_6b01);
        // _IO('k', 0)
        assert_eq!(Verb::Reset.code().0, 0x0000_6b00);
    }

    #[test]
    fn every_verb_is_in_family_and_unique() {
        for verb in Verb::ALL {
            assert!(verb.code().in_family(), "{verb}");
            assert_eq!(Verb::from_code(verb.code()), Some(verb));
        }
        let nrs: HashSet<u8> = Verb::ALL.iter().map(|v| v.code().nr()).collect();
        assert_eq!(nrs.len(), Verb::ALL.len());
    }

    #[test]
    fn foreign_magic_is_out_of_family() {
        let code = CommandCode::new(Direction::NONE, b'q', 0, 0);
        assert!(!code.in_family());
        assert_eq!(Verb::from_code(code), None);
    }

    #[test]
    fn number_past_max_is_out_of_family() {
        let code = CommandCode::new(Direction::NONE, COMMAND_MAGIC, MAX_COMMAND_NR + 1, 0);
        assert!(!code.in_family());
    }

    #[test]
    fn mismatched_direction_is_in_family_but_not_a_verb() {
        let code = CommandCode::new(Direction::WRITE, COMMAND_MAGIC, 0, 4);
        assert!(code.in_family());
        assert_eq!(Verb::from_code(code), None);
    }

    #[test]
    fn direction_predicates() {
        assert!(Direction::READ.writes_caller());
        assert!(!Direction::READ.reads_caller());
        assert!(Direction::WRITE.reads_caller());
        assert!(Direction::READ_WRITE.reads_caller() && Direction::READ_WRITE.writes_caller());
        assert!(!Direction::NONE.reads_caller() && !Direction::NONE.writes_caller());
    }
}
