//! Per-room match state machine.
//!
//! One [`Match`] instance holds all mutable game state for a room:
//! board, turn, round status, bias/referee state, winners, and the
//! rematch votes. It validates and applies player actions and reports
//! its effects as ordered [`GameEvent`]s; delivery and persistence are
//! the server's job.
//!
//! The struct is not synchronized. The server owns every live match
//! from a single task and feeds it actions one at a time.

use std::collections::HashMap;

use rand::Rng;

use crate::board::Board;
use crate::error::ActionError;
use crate::events::{Action, Audience, GameEvent};
use crate::player::Player;
use crate::referee::{is_normal, pick_label, RefereeFamily, REFEREE_COUNTDOWN};
use crate::status::MatchStatus;
use crate::symbol::Symbol;
use crate::theme::RoomTheme;
use crate::{RoomId, UserId};

/// Winner-list sentinel recorded for a drawn round.
pub const DRAW: UserId = 0;

/// Probability that a fair referee honors the requested cell when the
/// bias degree gives the actor no advantage.
const FAIR_PLACEMENT_CHANCE: f32 = 0.3;

/// Live state of one room's best-of-three match.
#[derive(Debug, Clone)]
pub struct Match {
    room_id: RoomId,
    theme: RoomTheme,
    board: Board,
    players: [Option<Player>; 2],
    online: [bool; 2],
    current_turn: Option<UserId>,
    status: MatchStatus,

    /// Signed advantage in {-1, 0, +1}; positive favors slot 0.
    bias_degree: i8,
    bribe_counts: [u32; 2],
    referee_status: String,
    referee_count: u32,

    /// One entry per completed round: winner id, or [`DRAW`].
    winners: Vec<UserId>,
    retry_requests: HashMap<UserId, bool>,
}

impl Match {
    /// Create a fresh match for `room_id` with the creator in slot 0.
    pub fn new(
        room_id: RoomId,
        theme: RoomTheme,
        creator_id: UserId,
        creator_nickname: impl Into<String>,
        rng: &mut impl Rng,
    ) -> Self {
        Match {
            room_id,
            theme,
            board: Board::new(theme.board_size),
            players: [
                Some(Player::new(creator_id, Symbol::X, creator_nickname)),
                None,
            ],
            online: [true, false],
            current_turn: None,
            status: MatchStatus::Round1,
            bias_degree: 0,
            bribe_counts: [0, 0],
            referee_status: pick_label(RefereeFamily::Normal, rng),
            referee_count: 0,
            winners: Vec::new(),
            retry_requests: HashMap::new(),
        }
    }

    /// Seat the second participant in slot 1 and decide the opening
    /// turn uniformly at random.
    pub fn join_challenger(
        &mut self,
        challenger_id: UserId,
        nickname: impl Into<String>,
        rng: &mut impl Rng,
    ) {
        self.players[1] = Some(Player::new(challenger_id, Symbol::O, nickname));
        self.online[1] = true;
        self.pick_opening_turn(rng);
    }

    /// Reconnect a known participant: flip their online flag back on,
    /// touch nothing else. Returns `false` for strangers.
    pub fn reconnect(&mut self, user: UserId) -> bool {
        match self.slot_of(user) {
            Some(slot) => {
                self.online[slot] = true;
                true
            }
            None => false,
        }
    }

    /// Update a participant's presence flag, returning `true` if the
    /// flag actually changed.
    pub fn set_online(&mut self, user: UserId, online: bool) -> bool {
        match self.slot_of(user) {
            Some(slot) if self.online[slot] != online => {
                self.online[slot] = online;
                true
            }
            _ => false,
        }
    }

    // -------------------------------------------------------------------------
    // Action dispatch
    // -------------------------------------------------------------------------

    /// Validate and apply one player action.
    ///
    /// On rejection nothing is mutated and nothing is broadcast; the
    /// error carries the client-visible message.
    pub fn apply(
        &mut self,
        actor: UserId,
        action: Action,
        rng: &mut impl Rng,
    ) -> Result<Vec<GameEvent>, ActionError> {
        match action {
            Action::MarkCell { x, y } => self.mark_cell(actor, x, y, rng),
            Action::Bribe => self.bribe(actor),
            Action::Accuse => self.accuse(actor, rng),
            Action::Retry { want } => self.retry(actor, want, rng),
        }
    }

    /// Attempt to mark `(x, y)` for `actor`.
    ///
    /// Whether the literal cell is honored depends on the current bias:
    /// an advantaged actor always gets the requested cell, a neutral
    /// one gets it with probability [`FAIR_PLACEMENT_CHANCE`], and a
    /// disadvantaged one never does — the referee instead marks a
    /// random *other* empty cell with the actor's symbol (falling back
    /// to the requested cell when it is the only one left).
    fn mark_cell(
        &mut self,
        actor: UserId,
        x: i64,
        y: i64,
        rng: &mut impl Rng,
    ) -> Result<Vec<GameEvent>, ActionError> {
        if !self.board.in_bounds(x, y) {
            return Err(ActionError::OutOfBounds);
        }
        let (x, y) = (x as usize, y as usize);
        if self.board.cell(x, y).is_some() {
            return Err(ActionError::CellOccupied);
        }
        if !self.status.in_round() || self.current_turn != Some(actor) {
            return Err(ActionError::NotYourTurn);
        }
        let slot = self.slot_of(actor).ok_or(ActionError::UnknownPlayer)?;
        let symbol = Symbol::for_slot(slot);

        let mut events = Vec::new();

        // Positive advantage favors the actor regardless of slot.
        let bias_advantage = i32::from(self.bias_degree) * if slot == 0 { 1 } else { -1 };
        let honest = bias_advantage > 0
            || (bias_advantage == 0 && rng.gen::<f32>() < FAIR_PLACEMENT_CHANCE);

        if honest {
            self.board.mark(x, y, symbol);
        } else {
            let empties = self.board.empty_cells_except(x, y);
            if empties.is_empty() {
                self.board.mark(x, y, symbol);
            } else {
                let (cx, cy) = empties[rng.gen_range(0..empties.len())];
                self.board.mark(cx, cy, symbol);
            }
        }

        // Abnormal referee states wear off after a fixed number of marks.
        if self.referee_count > 0 {
            self.referee_count -= 1;
            if self.referee_count == 0 && !is_normal(&self.referee_status) {
                self.referee_status = pick_label(RefereeFamily::Normal, rng);
                events.push(GameEvent::system(
                    Audience::Both,
                    "REFEREE: Now I'm reformed and fair!",
                ));
            }
        }

        events.extend(self.evaluate_round(actor, symbol));
        Ok(events)
    }

    /// Win/draw evaluation after a mark has landed.
    ///
    /// Win is checked before draw. A decided round advances the status
    /// and emits results; an undecided one passes the turn.
    fn evaluate_round(&mut self, actor: UserId, symbol: Symbol) -> Vec<GameEvent> {
        let round_over = if self.board.has_winning_run(symbol) {
            self.winners.push(actor);
            true
        } else if self.board.is_full() {
            self.winners.push(DRAW);
            true
        } else {
            false
        };

        if round_over {
            self.status = self.status.after_round_over();
            let mut events = vec![GameEvent::Results];
            if self.status.is_finished() {
                events.push(GameEvent::Finalize);
            }
            events
        } else {
            self.current_turn = self.opponent_of(actor);
            vec![GameEvent::State]
        }
    }

    /// Adjust the bias one step in the actor's favor.
    ///
    /// Ignored (with a private notice) while the referee is abnormal.
    /// The lifetime bribe count is telemetry and increments even when
    /// the bias is already saturated.
    fn bribe(&mut self, actor: UserId) -> Result<Vec<GameEvent>, ActionError> {
        let slot = self.slot_of(actor).ok_or(ActionError::UnknownPlayer)?;

        if !is_normal(&self.referee_status) {
            return Ok(vec![GameEvent::system(
                Audience::Actor,
                "SYSTEM: Bribe ignored, referee status is not normal",
            )]);
        }

        self.bribe_counts[slot] += 1;

        let adjustment: i8 = if slot == 0 { 1 } else { -1 };
        let adjusted = self.bias_degree + adjustment;
        if (-1..=1).contains(&adjusted) {
            self.bias_degree = adjusted;
        }

        Ok(vec![
            GameEvent::system(Audience::Actor, "SYSTEM: Your Bribe accepted!"),
            GameEvent::State,
        ])
    }

    /// Accuse the opponent of bribery.
    ///
    /// A wrong accusation (nobody bribed, or the accuser held the
    /// advantage) angers the referee and turns the bias against the
    /// accuser; a correct one saddens the referee and flips the
    /// advantage to the accuser. Either way the abnormal state lasts
    /// [`REFEREE_COUNTDOWN`] marks.
    fn accuse(&mut self, actor: UserId, rng: &mut impl Rng) -> Result<Vec<GameEvent>, ActionError> {
        let slot = self.slot_of(actor).ok_or(ActionError::UnknownPlayer)?;

        if !is_normal(&self.referee_status) {
            return Ok(vec![GameEvent::system(
                Audience::Actor,
                "SYSTEM: Accusation is ineffective!",
            )]);
        }

        let opponent_advantaged =
            (slot == 0 && self.bias_degree < 0) || (slot == 1 && self.bias_degree > 0);

        if self.bias_degree == 0 {
            self.referee_status = pick_label(RefereeFamily::Angry, rng);
            self.bias_degree = if slot == 0 { -1 } else { 1 };
        } else if opponent_advantaged {
            self.referee_status = pick_label(RefereeFamily::Sad, rng);
            self.bias_degree = -self.bias_degree;
        } else {
            // Self-accusation: the accuser held the advantage.
            self.referee_status = pick_label(RefereeFamily::Angry, rng);
            self.bias_degree = -self.bias_degree;
        }
        self.referee_count = REFEREE_COUNTDOWN;

        let line = if self.referee_status.starts_with("angry") {
            "REFEREE: Wrong accusation! I'm angry!"
        } else {
            "REFEREE: Sorry I'm regret..."
        };

        Ok(vec![
            GameEvent::system(Audience::Both, line),
            GameEvent::State,
        ])
    }

    /// Record a continuation vote.
    ///
    /// A `false` vote ends the match immediately. A `true` vote only
    /// notifies the opponent; the round is resolved once both players
    /// have voted.
    fn retry(
        &mut self,
        actor: UserId,
        want: bool,
        rng: &mut impl Rng,
    ) -> Result<Vec<GameEvent>, ActionError> {
        if !self.status.awaiting_retry() {
            return Ok(Vec::new());
        }
        self.slot_of(actor).ok_or(ActionError::UnknownPlayer)?;

        self.retry_requests.insert(actor, want);

        if !want {
            self.status = MatchStatus::Finished;
            return Ok(vec![
                GameEvent::system(
                    Audience::Opponent,
                    "SYSTEM: Your opponent declined a rematch",
                ),
                GameEvent::State,
                GameEvent::Finalize,
            ]);
        }

        let mut events = vec![GameEvent::system(
            Audience::Opponent,
            "SYSTEM: Your opponent sent retry request!",
        )];

        if self.retry_requests.len() == 2 {
            // Both votes are `true` here; a refusal ends the match above.
            self.status = self.status.next_round();
            self.reset_for_next_round(rng);
            events.push(GameEvent::State);
        }

        Ok(events)
    }

    /// Reset per-round state for the next round: cleared board, neutral
    /// bias, fresh fair referee, fresh opening turn, no votes.
    fn reset_for_next_round(&mut self, rng: &mut impl Rng) {
        self.board.clear();
        self.bribe_counts = [0, 0];
        self.bias_degree = 0;
        self.referee_status = pick_label(RefereeFamily::Normal, rng);
        self.referee_count = 0;
        self.retry_requests.clear();
        self.pick_opening_turn(rng);
    }

    fn pick_opening_turn(&mut self, rng: &mut impl Rng) {
        let slot = rng.gen_range(0..2usize);
        self.current_turn = self.players[slot]
            .as_ref()
            .or(self.players[0].as_ref())
            .map(|p| p.id);
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn theme(&self) -> RoomTheme {
        self.theme
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Player occupying `slot`, if seated.
    pub fn player(&self, slot: usize) -> Option<&Player> {
        self.players[slot].as_ref()
    }

    /// Seated players in slot order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter_map(|p| p.as_ref())
    }

    /// Slot index of `user`, if seated.
    pub fn slot_of(&self, user: UserId) -> Option<usize> {
        self.players
            .iter()
            .position(|p| p.as_ref().map(|p| p.id) == Some(user))
    }

    /// The other seated player's id.
    pub fn opponent_of(&self, user: UserId) -> Option<UserId> {
        let slot = self.slot_of(user)?;
        self.players[1 - slot].as_ref().map(|p| p.id)
    }

    /// Presence flag for `user`.
    pub fn is_online(&self, user: UserId) -> bool {
        self.slot_of(user).map(|s| self.online[s]).unwrap_or(false)
    }

    /// Presence flags keyed by user id, in slot order.
    pub fn online_by_user(&self) -> Vec<(UserId, bool)> {
        self.players
            .iter()
            .enumerate()
            .filter_map(|(slot, p)| p.as_ref().map(|p| (p.id, self.online[slot])))
            .collect()
    }

    /// Id of the player allowed to act next, once both are seated.
    pub fn current_turn(&self) -> Option<UserId> {
        self.current_turn
    }

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    pub fn bias_degree(&self) -> i8 {
        self.bias_degree
    }

    pub fn bribe_counts(&self) -> [u32; 2] {
        self.bribe_counts
    }

    pub fn referee_status(&self) -> &str {
        &self.referee_status
    }

    pub fn referee_count(&self) -> u32 {
        self.referee_count
    }

    pub fn winners(&self) -> &[UserId] {
        &self.winners
    }

    /// Continuation votes collected for the current round break.
    pub fn retry_requests(&self) -> &HashMap<UserId, bool> {
        &self.retry_requests
    }
}
