//! Session state and core value types
//!
//! `GameSession` is the single mutable aggregate of a match. Only the
//! director mutates it.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::settle::SettlementMonitor;

/// Phase of the game director
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Title screen, waiting for the host to confirm start
    Splash,
    /// Building the roster
    Setup,
    /// Waiting for the current player to shake or tap
    Ready,
    /// Dice are in the player's hand
    Shaking,
    /// Dice are in the air or tumbling
    Rolling,
    /// Roll read and evaluated
    Results,
    /// Doubles: roller picks who drinks
    Deciding,
    /// A die left the table
    Sloppy,
}

impl GamePhase {
    /// Whether the dice are live (physics is stepped)
    pub fn in_play(&self) -> bool {
        !matches!(self, GamePhase::Splash | GamePhase::Setup)
    }
}

/// A seat at the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
}

impl Player {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Match state. Roster order is turn order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    pub players: Vec<Player>,
    /// Whose turn it is (index into `players`)
    pub turn: usize,
    /// Three Man title holder (`None` = unassigned)
    pub title_holder: Option<usize>,
    pub phase: GamePhase,
    /// Consecutive-still-tick tracking for the current throw
    pub settle: SettlementMonitor,
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new(SettlementMonitor::default())
    }
}

impl GameSession {
    pub fn new(settle: SettlementMonitor) -> Self {
        Self {
            players: Vec::new(),
            turn: 0,
            title_holder: None,
            phase: GamePhase::Splash,
            settle,
        }
    }

    /// Player whose turn it is
    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.turn)
    }

    pub fn title_holder_player(&self) -> Option<&Player> {
        self.title_holder.and_then(|i| self.players.get(i))
    }

    /// Move the turn to the next seat
    pub fn advance_turn(&mut self) {
        if !self.players.is_empty() {
            self.turn = (self.turn + 1) % self.players.len();
        }
    }

    /// Clear per-match progress, keeping the roster
    pub fn reset_progress(&mut self) {
        self.turn = 0;
        self.title_holder = None;
        self.settle.reset();
    }

    pub fn hud(&self) -> Hud {
        Hud {
            turn: self.current_player().map(|p| p.name.clone()),
            three_man: self.title_holder_player().map(|p| p.name.clone()),
            phase: self.phase,
        }
    }
}

/// Heads-up display snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hud {
    pub turn: Option<String>,
    pub three_man: Option<String>,
    pub phase: GamePhase,
}

impl Hud {
    pub fn three_man_line(&self) -> String {
        match &self.three_man {
            Some(name) => format!("3MAN: {}", name.to_uppercase()),
            None => "3MAN: NONE".to_string(),
        }
    }

    pub fn turn_line(&self) -> String {
        match &self.turn {
            Some(name) => format!("TURN: {}", name.to_uppercase()),
            None => "TURN: -".to_string(),
        }
    }
}

impl fmt::Display for Hud {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {}", self.three_man_line(), self.turn_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(names: &[&str]) -> GameSession {
        let mut s = GameSession::default();
        s.players = names.iter().map(|n| Player::new(*n)).collect();
        s
    }

    #[test]
    fn test_advance_turn_wraps() {
        let mut s = session(&["a", "b", "c"]);
        s.turn = 2;
        s.advance_turn();
        assert_eq!(s.turn, 0);
    }

    #[test]
    fn test_hud_lines() {
        let mut s = session(&["alice", "bob"]);
        s.turn = 1;
        let hud = s.hud();
        assert_eq!(hud.three_man_line(), "3MAN: NONE");
        assert_eq!(hud.turn_line(), "TURN: BOB");

        s.title_holder = Some(0);
        assert_eq!(s.hud().three_man_line(), "3MAN: ALICE");
    }

    #[test]
    fn test_reset_progress_keeps_roster() {
        let mut s = session(&["a", "b"]);
        s.turn = 1;
        s.title_holder = Some(1);
        s.reset_progress();
        assert_eq!(s.players.len(), 2);
        assert_eq!(s.turn, 0);
        assert_eq!(s.title_holder, None);
    }

    #[test]
    fn test_in_play() {
        assert!(!GamePhase::Splash.in_play());
        assert!(!GamePhase::Setup.in_play());
        assert!(GamePhase::Rolling.in_play());
    }
}
