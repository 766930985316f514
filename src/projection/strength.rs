// Team strength model.
//
// Derives each team's attacking/defensive strength scalars and clean-sheet
// probability from season-to-date goal-expectation history, normalized so
// that 1.0 means league average. Teams with no history fall back to neutral
// defaults rather than erroring.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::config::StrengthConfig;
use crate::model::{Team, TeamId, TeamMatchXg};

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Strength scalars for one team. `attack` and `defense` are normalized so
/// a larger value always means a stronger unit; `cs_prob` is the per-match
/// clean-sheet probability, bounded well away from 0 and 1.
#[derive(Debug, Clone, Copy)]
pub struct TeamStrength {
    pub attack: f64,
    pub defense: f64,
    pub cs_prob: f64,
}

/// Per-team strength table plus display names, computed once per run and
/// shared read-only by every downstream consumer.
#[derive(Debug, Clone)]
pub struct StrengthModel {
    strengths: BTreeMap<TeamId, TeamStrength>,
    short_names: BTreeMap<TeamId, String>,
}

impl StrengthModel {
    /// Strength for a team, neutral defaults for an unknown id.
    pub fn strength(&self, team: TeamId) -> TeamStrength {
        self.strengths
            .get(&team)
            .copied()
            .unwrap_or_else(default_strength)
    }

    pub fn cs_prob(&self, team: TeamId) -> f64 {
        self.strength(team).cs_prob
    }

    /// Display abbreviation for opponent labels, `"?"` for an unknown id.
    pub fn short_name(&self, team: TeamId) -> &str {
        self.short_names.get(&team).map(String::as_str).unwrap_or("?")
    }

    pub fn team_ids(&self) -> impl Iterator<Item = TeamId> + '_ {
        self.strengths.keys().copied()
    }

    pub fn team_count(&self) -> usize {
        self.strengths.len()
    }
}

fn default_strength() -> TeamStrength {
    TeamStrength {
        attack: 1.0,
        defense: 1.0,
        cs_prob: 0.25,
    }
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// Build the strength model from the team roster and each team's
/// goal-expectation history.
///
/// For a team with at least one played match:
/// - attack  = avg expected goals for  / league average
/// - defense = league average / avg expected goals against (a stingier
///   defense concedes less, so the scalar grows)
/// - cs_prob = clamp(cs_min, cs_max, cs_base - cs_slope * avg xGA)
///
/// A team with no history gets the neutral defaults (1.0 / 1.0 / 0.25).
pub fn build_strength_model(
    teams: &[Team],
    history: &HashMap<TeamId, Vec<TeamMatchXg>>,
    cfg: &StrengthConfig,
) -> StrengthModel {
    let mut strengths = BTreeMap::new();
    let mut short_names = BTreeMap::new();

    for team in teams {
        let strength = match history.get(&team.id).filter(|h| !h.is_empty()) {
            Some(matches) => {
                let n = matches.len() as f64;
                let avg_xgf = matches.iter().map(|m| m.xg_for).sum::<f64>() / n;
                let avg_xga = matches.iter().map(|m| m.xg_against).sum::<f64>() / n;
                TeamStrength {
                    attack: avg_xgf / cfg.league_avg_xg,
                    defense: cfg.league_avg_xg / avg_xga.max(f64::EPSILON),
                    cs_prob: (cfg.cs_base - cfg.cs_slope * avg_xga).clamp(cfg.cs_min, cfg.cs_max),
                }
            }
            None => {
                debug!(team = %team.short_name, "no xG history, using neutral strength");
                default_strength()
            }
        };

        strengths.insert(team.id, strength);
        short_names.insert(team.id, team.short_name.clone());
    }

    StrengthModel {
        strengths,
        short_names,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
