use serde::{Deserialize, Serialize};

use crate::engine::Outcome;

/// Side assignment within a lobby. Assigned by the lobby service at
/// host/join time and read-only to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Red,
    Blue,
}

impl Side {
    pub fn role(&self) -> Role {
        match self {
            Side::Red => Role::Runner,
            Side::Blue => Role::Chaser,
        }
    }

    pub fn opposite(&self) -> Side {
        match self {
            Side::Red => Side::Blue,
            Side::Blue => Side::Red,
        }
    }
}

/// Chase role committed per side: red runs, blue pursues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Runner,
    Chaser,
}

impl Role {
    /// Whether this role wins under the given terminal outcome.
    pub fn wins(&self, outcome: Outcome) -> bool {
        matches!(
            (self, outcome),
            (Role::Runner, Outcome::RunnerEscaped) | (Role::Chaser, Outcome::ChaserCaught)
        )
    }
}

/// The per-lobby record owned by the remote authority. The engine keeps
/// only an eventually-consistent mirror of it; score and terminal state are
/// remote-owned fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LobbyScoreRecord {
    pub code: String,
    #[serde(default)]
    pub red_score: u32,
    #[serde(default)]
    pub blue_score: u32,
    #[serde(default)]
    pub red_ready: bool,
    #[serde(default)]
    pub blue_ready: bool,
    #[serde(default)]
    pub runner_progress: f64,
    #[serde(default)]
    pub chaser_progress: f64,
    #[serde(default)]
    pub game_over: bool,
    #[serde(default)]
    pub outcome: Option<Outcome>,
}

impl LobbyScoreRecord {
    pub fn score_of(&self, side: Side) -> u32 {
        match side {
            Side::Red => self.red_score,
            Side::Blue => self.blue_score,
        }
    }

    pub fn set_score_of(&mut self, side: Side, score: u32) {
        match side {
            Side::Red => self.red_score = score,
            Side::Blue => self.blue_score = score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_follow_sides() {
        assert_eq!(Side::Red.role(), Role::Runner);
        assert_eq!(Side::Blue.role(), Role::Chaser);
        assert_eq!(Side::Red.opposite(), Side::Blue);
    }

    #[test]
    fn win_attribution_matches_outcome_tag() {
        assert!(Role::Runner.wins(Outcome::RunnerEscaped));
        assert!(!Role::Runner.wins(Outcome::ChaserCaught));
        assert!(Role::Chaser.wins(Outcome::ChaserCaught));
    }

    #[test]
    fn record_serde_roundtrip() {
        let record = LobbyScoreRecord {
            code: "ABCD".to_string(),
            red_score: 1500,
            blue_score: 900,
            game_over: true,
            outcome: Some(Outcome::RunnerEscaped),
            ..Default::default()
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("runner_escaped"));
        let back: LobbyScoreRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.score_of(Side::Red), 1500);
        assert_eq!(back.outcome, Some(Outcome::RunnerEscaped));
    }

    #[test]
    fn missing_fields_default() {
        let back: LobbyScoreRecord = serde_json::from_str(r#"{"code":"X"}"#).unwrap();
        assert_eq!(back.red_score, 0);
        assert!(!back.game_over);
        assert_eq!(back.outcome, None);
    }
}
