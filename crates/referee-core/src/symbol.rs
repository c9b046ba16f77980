//! Player symbols (X / O).

/// Mark placed on the board by a player.
///
/// Slot 0 (the room creator) always plays `X`; slot 1 (the challenger)
/// always plays `O`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Symbol {
    X,
    O,
}

impl Symbol {
    /// Convert to the single-character wire representation.
    pub fn as_char(self) -> char {
        match self {
            Symbol::X => 'X',
            Symbol::O => 'O',
        }
    }

    /// Symbol assigned to a player slot (0 or 1).
    pub fn for_slot(slot: usize) -> Symbol {
        if slot == 0 {
            Symbol::X
        } else {
            Symbol::O
        }
    }
}
