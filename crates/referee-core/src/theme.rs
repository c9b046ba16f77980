//! Room themes.
//!
//! A room's theme string selects the board size and whether the room
//! advertises the bribery mechanic (`"biased"`) or not (`"fair"`).
//! The flag is cosmetic: it flows through to state snapshots but does
//! not gate any rule.

/// Parsed room theme.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RoomTheme {
    pub board_size: usize,
    pub biased: bool,
}

impl RoomTheme {
    /// Parse a configured theme string (`"3x3_biased"`, `"5x5_fair"`,
    /// ...). Unknown themes fall back to a fair 3x3 room.
    pub fn parse(theme: &str) -> RoomTheme {
        match theme {
            "3x3_biased" => RoomTheme {
                board_size: 3,
                biased: true,
            },
            "3x3_fair" => RoomTheme {
                board_size: 3,
                biased: false,
            },
            "5x5_biased" => RoomTheme {
                board_size: 5,
                biased: true,
            },
            "5x5_fair" => RoomTheme {
                board_size: 5,
                biased: false,
            },
            _ => RoomTheme {
                board_size: 3,
                biased: false,
            },
        }
    }

    /// Snapshot label for this theme.
    pub fn bias_label(self) -> &'static str {
        if self.biased {
            "biased"
        } else {
            "fair"
        }
    }
}
