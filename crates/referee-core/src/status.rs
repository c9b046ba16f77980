//! Match lifecycle status.

/// Best-of-three lifecycle of a match.
///
/// Strictly forward-moving except that `Finished` is absorbing and can
/// be entered directly from any state by a rematch refusal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MatchStatus {
    Round1,
    Round1Finished,
    Round2,
    Round2Finished,
    Round3,
    Finished,
}

impl MatchStatus {
    /// Wire representation (`"round1"`, `"round1_finished"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Round1 => "round1",
            MatchStatus::Round1Finished => "round1_finished",
            MatchStatus::Round2 => "round2",
            MatchStatus::Round2Finished => "round2_finished",
            MatchStatus::Round3 => "round3",
            MatchStatus::Finished => "finished",
        }
    }

    /// Status after the current round ends in a win or a draw.
    ///
    /// Round 3 is the last, so it ends the match outright.
    pub fn after_round_over(self) -> MatchStatus {
        match self {
            MatchStatus::Round1 => MatchStatus::Round1Finished,
            MatchStatus::Round2 => MatchStatus::Round2Finished,
            MatchStatus::Round3 => MatchStatus::Finished,
            other => other,
        }
    }

    /// Status after both players agreed to a rematch.
    pub fn next_round(self) -> MatchStatus {
        match self {
            MatchStatus::Round1Finished => MatchStatus::Round2,
            MatchStatus::Round2Finished => MatchStatus::Round3,
            _ => MatchStatus::Finished,
        }
    }

    /// True while a round is being played.
    pub fn in_round(self) -> bool {
        matches!(
            self,
            MatchStatus::Round1 | MatchStatus::Round2 | MatchStatus::Round3
        )
    }

    /// True between rounds, when rematch votes are accepted.
    pub fn awaiting_retry(self) -> bool {
        matches!(
            self,
            MatchStatus::Round1Finished | MatchStatus::Round2Finished
        )
    }

    /// True once the match has terminally ended.
    pub fn is_finished(self) -> bool {
        self == MatchStatus::Finished
    }
}
