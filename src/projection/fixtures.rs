// Fixture analyzer.
//
// Consumes the full fixture list and, for a rolling lookahead window, builds
// each team's per-round schedule, classifies double and blank rounds both
// league-wide and per team, and attaches a difficulty multiplier to every
// fixture. Difficulty later *divides* a player's scoring rate, so a lower
// value always means a better fixture.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::config::{DifficultyConfig, HorizonConfig};
use crate::model::{Fixture, Round, TeamId};
use crate::projection::strength::StrengthModel;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One fixture from a single team's point of view.
#[derive(Debug, Clone)]
pub struct FixtureSlot {
    pub round: Round,
    pub opponent: TeamId,
    pub is_home: bool,
    pub difficulty: f64,
}

/// Per-team per-round schedule plus double/blank classification for the
/// detection window, computed once per run and shared by all consumers.
#[derive(Debug, Clone)]
pub struct FixtureOutlook {
    pub start_round: Round,
    pub projection_rounds: u32,
    schedules: BTreeMap<TeamId, BTreeMap<Round, Vec<FixtureSlot>>>,
    /// Rounds whose league-wide fixture count exceeds the standard count.
    pub double_rounds: BTreeSet<Round>,
    /// Rounds whose league-wide fixture count falls short of the standard.
    pub blank_rounds: BTreeSet<Round>,
    team_doubles: BTreeMap<TeamId, Vec<Round>>,
    team_blanks: BTreeMap<TeamId, Vec<Round>>,
}

impl FixtureOutlook {
    /// The fixtures a team plays in a round: empty = blank, one = normal,
    /// two or more = double.
    pub fn fixtures_for(&self, team: TeamId, round: Round) -> &[FixtureSlot] {
        self.schedules
            .get(&team)
            .and_then(|rounds| rounds.get(&round))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Rounds of the projection window, in order.
    pub fn projection_window(&self) -> impl Iterator<Item = Round> + '_ {
        self.start_round..self.start_round + self.projection_rounds
    }

    pub fn team_doubles(&self, team: TeamId) -> &[Round] {
        self.team_doubles
            .get(&team)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn team_blanks(&self, team: TeamId) -> &[Round] {
        self.team_blanks
            .get(&team)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether the team plays twice in some round within the next `rounds`
    /// rounds (counted from the window start).
    pub fn has_double_within(&self, team: TeamId, rounds: u32) -> bool {
        self.team_doubles(team)
            .iter()
            .any(|&r| r < self.start_round + rounds)
    }

    pub fn has_blank_within(&self, team: TeamId, rounds: u32) -> bool {
        self.team_blanks(team)
            .iter()
            .any(|&r| r < self.start_round + rounds)
    }

    /// The nearest upcoming league-wide double round, if any.
    pub fn next_double_round(&self) -> Option<Round> {
        self.double_rounds.iter().next().copied()
    }
}

// ---------------------------------------------------------------------------
// Difficulty
// ---------------------------------------------------------------------------

/// Difficulty multiplier for facing `opponent_defense` at the given venue.
/// A stronger-defense opponent raises difficulty; playing at home lowers it.
/// Clamped so the later rate division can never blow up.
pub fn fixture_difficulty(opponent_defense: f64, is_home: bool, cfg: &DifficultyConfig) -> f64 {
    let venue = if is_home {
        cfg.home_factor
    } else {
        cfg.away_factor
    };
    (opponent_defense * venue).clamp(cfg.min, cfg.max)
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// Build the fixture outlook for the detection window starting at
/// `start_round`.
///
/// A round is a league-wide double when its fixture count exceeds the
/// standard count (teams / 2), and blank-affected when it falls short.
/// Per-team doubles/blanks are read off each team's own schedule, with
/// blanks only counted for rounds the league actually plays.
pub fn build_fixture_outlook(
    fixtures: &[Fixture],
    strengths: &StrengthModel,
    start_round: Round,
    horizon: &HorizonConfig,
    difficulty: &DifficultyConfig,
) -> FixtureOutlook {
    let end_round = start_round + horizon.detection_rounds;

    let standard_count = match strengths.team_count() / 2 {
        0 => 10,
        n => n,
    };

    // League-wide fixture counts per round in the window.
    let mut round_counts: BTreeMap<Round, usize> = BTreeMap::new();
    for fixture in fixtures {
        let Some(round) = fixture.round else { continue };
        if round >= start_round && round < end_round {
            *round_counts.entry(round).or_insert(0) += 1;
        }
    }

    let mut double_rounds = BTreeSet::new();
    let mut blank_rounds = BTreeSet::new();
    for (&round, &count) in &round_counts {
        if count > standard_count {
            double_rounds.insert(round);
        } else if count < standard_count {
            blank_rounds.insert(round);
        }
    }
    debug!(
        ?double_rounds,
        ?blank_rounds,
        standard_count,
        "fixture window classified"
    );

    // Per-team schedules with difficulty attached.
    let mut schedules: BTreeMap<TeamId, BTreeMap<Round, Vec<FixtureSlot>>> = BTreeMap::new();
    for team in strengths.team_ids() {
        schedules.insert(team, BTreeMap::new());
    }

    for fixture in fixtures {
        let Some(round) = fixture.round else { continue };
        if round < start_round || round >= end_round {
            continue;
        }
        for (team, opponent, is_home) in [
            (fixture.home, fixture.away, true),
            (fixture.away, fixture.home, false),
        ] {
            let slot = FixtureSlot {
                round,
                opponent,
                is_home,
                difficulty: fixture_difficulty(
                    strengths.strength(opponent).defense,
                    is_home,
                    difficulty,
                ),
            };
            schedules
                .entry(team)
                .or_default()
                .entry(round)
                .or_default()
                .push(slot);
        }
    }

    // Deterministic ordering within a double round.
    for rounds in schedules.values_mut() {
        for slots in rounds.values_mut() {
            slots.sort_by_key(|s| s.opponent);
        }
    }

    // Per-team doubles and blanks, restricted to rounds the league plays.
    let mut team_doubles: BTreeMap<TeamId, Vec<Round>> = BTreeMap::new();
    let mut team_blanks: BTreeMap<TeamId, Vec<Round>> = BTreeMap::new();
    for (&team, rounds) in &schedules {
        let mut doubles = Vec::new();
        let mut blanks = Vec::new();
        for &round in round_counts.keys() {
            match rounds.get(&round).map(Vec::len).unwrap_or(0) {
                0 => blanks.push(round),
                1 => {}
                _ => doubles.push(round),
            }
        }
        team_doubles.insert(team, doubles);
        team_blanks.insert(team, blanks);
    }

    FixtureOutlook {
        start_round,
        projection_rounds: horizon.projection_rounds,
        schedules,
        double_rounds,
        blank_rounds,
        team_doubles,
        team_blanks,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
