// Core domain records shared by the projection pipeline and the decision
// engines. Everything here is produced fresh each run from provider data and
// treated as immutable afterward.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type PlayerId = u32;
pub type TeamId = u32;
pub type Round = u32;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// The four on-pitch positions. The provider encodes these as element types
/// 1-4 (GK, DEF, MID, FWD).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    Goalkeeper,
    Defender,
    Midfielder,
    Forward,
}

impl Position {
    /// Parse a provider element-type code (1-4). Returns `None` for anything
    /// else (e.g. the manager element type some seasons add).
    pub fn from_element_type(code: u8) -> Option<Self> {
        match code {
            1 => Some(Position::Goalkeeper),
            2 => Some(Position::Defender),
            3 => Some(Position::Midfielder),
            4 => Some(Position::Forward),
            _ => None,
        }
    }

    /// Points awarded for a goal scored at this position.
    pub fn goal_points(&self) -> f64 {
        match self {
            Position::Goalkeeper => 6.0,
            Position::Defender => 6.0,
            Position::Midfielder => 5.0,
            Position::Forward => 4.0,
        }
    }

    /// Points awarded for a clean sheet at this position. Midfielders get a
    /// single point, forwards nothing.
    pub fn clean_sheet_points(&self) -> f64 {
        match self {
            Position::Goalkeeper => 4.0,
            Position::Defender => 4.0,
            Position::Midfielder => 1.0,
            Position::Forward => 0.0,
        }
    }

    /// Whether clean-sheet probability feeds this position's bonus estimate.
    pub fn is_defensive(&self) -> bool {
        matches!(self, Position::Goalkeeper | Position::Defender)
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            Position::Goalkeeper => "GK",
            Position::Defender => "DEF",
            Position::Midfielder => "MID",
            Position::Forward => "FWD",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

// ---------------------------------------------------------------------------
// Teams and fixtures
// ---------------------------------------------------------------------------

/// A club in the league. Strength scalars are computed separately by the
/// strength model and never stored back onto this record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub short_name: String,
}

/// One scheduled match. `round` is `None` for fixtures the league has not yet
/// assigned to a round (postponements awaiting rescheduling).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    pub round: Option<Round>,
    pub home: TeamId,
    pub away: TeamId,
    pub finished: bool,
    pub home_goals: Option<u32>,
    pub away_goals: Option<u32>,
}

// ---------------------------------------------------------------------------
// Player season data
// ---------------------------------------------------------------------------

/// Provider availability status flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerStatus {
    Available,
    Doubtful,
    /// Injured, suspended, or otherwise out of the squad.
    Out,
}

impl PlayerStatus {
    /// Parse the provider's single-letter status code.
    pub fn from_code(code: &str) -> Self {
        match code {
            "a" => PlayerStatus::Available,
            "d" => PlayerStatus::Doubtful,
            _ => PlayerStatus::Out,
        }
    }

    /// Fraction of expected minutes retained under this status, used when no
    /// explicit chance-of-playing figure is published.
    pub fn availability_fraction(&self) -> f64 {
        match self {
            PlayerStatus::Available => 1.0,
            PlayerStatus::Doubtful => 0.75,
            PlayerStatus::Out => 0.0,
        }
    }
}

/// Direction of a player's recent price movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceTrend {
    Rising,
    Flat,
    Falling,
}

/// A player's season-to-date statistical line, normalized from the provider's
/// bootstrap payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerStatLine {
    pub id: PlayerId,
    pub name: String,
    pub team: TeamId,
    pub position: Position,
    pub minutes: u32,
    pub starts: u32,
    pub goals: u32,
    pub assists: u32,
    pub total_points: i32,
    /// Price in the league's display unit (e.g. 7.5).
    pub price: f64,
    /// Percent of managers holding this player, 0-100.
    pub ownership: f64,
    pub status: PlayerStatus,
    /// Published chance of playing the next round, 0-100. `None` means no
    /// flag is set and the player is treated as fully available.
    pub chance_of_playing: Option<u32>,
    pub news: String,
    pub price_trend: PriceTrend,
}

/// Higher-fidelity season totals from an external enrichment source, matched
/// to a provider player by an out-of-scope identity-matching step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedStats {
    pub minutes: u32,
    pub matches: u32,
    /// True expected goals, season total.
    pub xg: f64,
    /// True expected assists, season total.
    pub xa: f64,
}

/// One row of a player's recent match history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSample {
    pub round: Round,
    pub minutes: u32,
    pub goals: u32,
    pub assists: u32,
    pub total_points: i32,
}

/// One match of a team's goal-expectation history, input to the strength
/// model. When no true xG feed is available the orchestration layer uses
/// actual goals from finished fixtures as the expectation proxy.
#[derive(Debug, Clone, Copy)]
pub struct TeamMatchXg {
    pub xg_for: f64,
    pub xg_against: f64,
}

// ---------------------------------------------------------------------------
// Manager squad
// ---------------------------------------------------------------------------

/// One of the manager's fifteen held players.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SquadPick {
    pub player: PlayerId,
    pub team: TeamId,
    /// 0 = bench, 1 = starter, 2 = captain, 3 = triple captain.
    pub multiplier: u32,
    /// Sale value in the league's display unit.
    pub selling_price: f64,
}

impl SquadPick {
    pub fn is_starter(&self) -> bool {
        self.multiplier > 0
    }
}

/// The one-time special powers a manager may still play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Chip {
    BenchBoost,
    TripleCaptain,
    FreeHit,
    Wildcard,
}

impl Chip {
    pub const ALL: [Chip; 4] = [
        Chip::BenchBoost,
        Chip::TripleCaptain,
        Chip::FreeHit,
        Chip::Wildcard,
    ];

    /// Provider name as it appears in entry history (`bboost`, `3xc`,
    /// `freehit`, `wildcard`).
    pub fn from_provider_name(name: &str) -> Option<Self> {
        match name {
            "bboost" => Some(Chip::BenchBoost),
            "3xc" => Some(Chip::TripleCaptain),
            "freehit" => Some(Chip::FreeHit),
            "wildcard" => Some(Chip::Wildcard),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Chip::BenchBoost => "Bench Boost",
            Chip::TripleCaptain => "Triple Captain",
            Chip::FreeHit => "Free Hit",
            Chip::Wildcard => "Wildcard",
        }
    }
}

// ---------------------------------------------------------------------------
// Derived classifications
// ---------------------------------------------------------------------------

/// Rolling form classification from recent match history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormTrend {
    Hot,
    Steady,
    Cold,
}

/// Provenance of a player's scoring-rate estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataQuality {
    /// Rates derived from true xG/xA totals.
    Enriched,
    /// Rates reverse-engineered from raw goal/assist counts.
    Approximated,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_codes_round_trip() {
        assert_eq!(Position::from_element_type(1), Some(Position::Goalkeeper));
        assert_eq!(Position::from_element_type(2), Some(Position::Defender));
        assert_eq!(Position::from_element_type(3), Some(Position::Midfielder));
        assert_eq!(Position::from_element_type(4), Some(Position::Forward));
        assert_eq!(Position::from_element_type(5), None);
        assert_eq!(Position::from_element_type(0), None);
    }

    #[test]
    fn goal_points_by_position() {
        assert_eq!(Position::Goalkeeper.goal_points(), 6.0);
        assert_eq!(Position::Defender.goal_points(), 6.0);
        assert_eq!(Position::Midfielder.goal_points(), 5.0);
        assert_eq!(Position::Forward.goal_points(), 4.0);
    }

    #[test]
    fn clean_sheet_points_by_position() {
        assert_eq!(Position::Goalkeeper.clean_sheet_points(), 4.0);
        assert_eq!(Position::Defender.clean_sheet_points(), 4.0);
        assert_eq!(Position::Midfielder.clean_sheet_points(), 1.0);
        assert_eq!(Position::Forward.clean_sheet_points(), 0.0);
    }

    #[test]
    fn status_codes() {
        assert_eq!(PlayerStatus::from_code("a"), PlayerStatus::Available);
        assert_eq!(PlayerStatus::from_code("d"), PlayerStatus::Doubtful);
        assert_eq!(PlayerStatus::from_code("i"), PlayerStatus::Out);
        assert_eq!(PlayerStatus::from_code("s"), PlayerStatus::Out);
        assert_eq!(PlayerStatus::from_code("u"), PlayerStatus::Out);
    }

    #[test]
    fn chip_provider_names() {
        assert_eq!(Chip::from_provider_name("bboost"), Some(Chip::BenchBoost));
        assert_eq!(Chip::from_provider_name("3xc"), Some(Chip::TripleCaptain));
        assert_eq!(Chip::from_provider_name("freehit"), Some(Chip::FreeHit));
        assert_eq!(Chip::from_provider_name("wildcard"), Some(Chip::Wildcard));
        assert_eq!(Chip::from_provider_name("assistant_manager"), None);
    }
}
