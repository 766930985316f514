// Player projection model.
//
// Blends per-90 scoring-involvement rates (true xG/xA when an enrichment
// record is available, otherwise rates approximated from raw season totals)
// with fixture difficulty and clean-sheet probability to produce a projected
// point value for every round of the lookahead window, plus the rollups the
// decision engines rank on.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::config::EngineConfig;
use crate::model::{
    DataQuality, EnrichedStats, FormTrend, MatchSample, PlayerId, PlayerStatLine, Position,
    PriceTrend, Round, TeamId,
};
use crate::projection::fixtures::FixtureOutlook;
use crate::projection::minutes::{expected_minutes, form_trend};
use crate::projection::strength::StrengthModel;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Projected return for one (player, round) cell. A blank round always has
/// zero points and zero difficulty.
#[derive(Debug, Clone, Serialize)]
pub struct RoundProjection {
    pub round: Round,
    pub points: f64,
    /// Display label, e.g. "MCI (H)" or "MCI (H), ARS (A)" for a double.
    pub opponents: String,
    pub difficulty: f64,
    pub is_double: bool,
    pub is_blank: bool,
}

/// A player's projections over the lookahead window plus rollups. Recomputed
/// fully each run; a pure function of the stat line, schedule, and strengths.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerProjection {
    pub player: PlayerId,
    pub name: String,
    pub team: TeamId,
    pub position: Position,
    pub price: f64,
    pub ownership: f64,
    pub quality: DataQuality,
    pub goals_p90: f64,
    pub assists_p90: f64,
    pub avg_minutes: f64,
    /// Season totals, kept for starter-reliability filtering downstream.
    pub minutes: u32,
    pub starts: u32,
    pub form: FormTrend,
    pub chance_of_playing: Option<u32>,
    pub price_trend: PriceTrend,
    /// Expected minutes next round; consumed by the lineup optimizer and
    /// bench-oriented chip scoring.
    pub xmin: f64,
    pub rounds: Vec<RoundProjection>,
    pub next_round_points: f64,
    pub next_four_points: f64,
    pub next_six_points: f64,
    /// Average difficulty over non-blank rounds in the planning window,
    /// neutral 1.0 when every early round is blank.
    pub avg_difficulty: f64,
}

impl PlayerProjection {
    /// Projected points for a specific round of the window, zero outside it.
    pub fn points_in_round(&self, round: Round) -> f64 {
        self.rounds
            .iter()
            .find(|r| r.round == round)
            .map(|r| r.points)
            .unwrap_or(0.0)
    }

    pub fn round_projection(&self, round: Round) -> Option<&RoundProjection> {
        self.rounds.iter().find(|r| r.round == round)
    }
}

// ---------------------------------------------------------------------------
// Rate estimation
// ---------------------------------------------------------------------------

/// A player's per-90 scoring involvement and minutes profile.
#[derive(Debug, Clone, Copy)]
struct RateEstimate {
    goals_p90: f64,
    assists_p90: f64,
    avg_minutes: f64,
    quality: DataQuality,
}

/// Derive the per-90 rate estimate, preferring the enrichment record's true
/// totals. Returns `None` when neither source has a usable sample; such
/// players simply get no projection.
fn estimate_rates(
    stat: &PlayerStatLine,
    enriched: Option<&EnrichedStats>,
    cfg: &EngineConfig,
) -> Option<RateEstimate> {
    let min_minutes = cfg.scoring.min_sample_minutes;

    if let Some(e) = enriched {
        if e.minutes >= min_minutes && e.matches >= 1 {
            let minutes = e.minutes as f64;
            return Some(RateEstimate {
                goals_p90: e.xg / minutes * 90.0,
                assists_p90: e.xa / minutes * 90.0,
                avg_minutes: minutes / e.matches as f64,
                quality: DataQuality::Enriched,
            });
        }
    }

    if stat.minutes >= min_minutes {
        let minutes = stat.minutes as f64;
        return Some(RateEstimate {
            goals_p90: stat.goals as f64 / minutes * 90.0,
            assists_p90: stat.assists as f64 / minutes * 90.0,
            avg_minutes: minutes / stat.starts.max(1) as f64,
            quality: DataQuality::Approximated,
        });
    }

    None
}

// ---------------------------------------------------------------------------
// Per-fixture scoring
// ---------------------------------------------------------------------------

/// Points projected for a single fixture before the availability and
/// minutes-probability scaling.
///
/// Difficulty divides the rates, so an easy fixture (low difficulty) lifts
/// the realized scoring rate. Clean-sheet points are not fixture-adjusted.
fn fixture_points_raw(
    rate: &RateEstimate,
    position: Position,
    difficulty: f64,
    cs_prob: f64,
    minutes_prob: f64,
    cfg: &EngineConfig,
) -> f64 {
    let s = &cfg.scoring;

    let xg = rate.goals_p90 / difficulty;
    let xa = rate.assists_p90 / difficulty;

    let goal_pts = xg * position.goal_points();
    let assist_pts = xa * s.assist_points;
    let cs_pts = cs_prob * position.clean_sheet_points();
    let appearance_pts = if minutes_prob > s.appearance_threshold {
        s.appearance_full
    } else {
        s.appearance_reduced
    };

    let basis = if position.is_defensive() {
        xg + xa + s.bonus_cs_weight * cs_prob
    } else {
        xg + xa
    };
    let bonus_pts = if basis > s.bonus_threshold {
        (basis * s.bonus_scale).min(s.bonus_cap)
    } else {
        0.0
    };

    goal_pts + assist_pts + cs_pts + appearance_pts + bonus_pts
}

/// Availability multiplier from the published chance-of-playing. An explicit
/// chance below the cutoff zeroes the projection outright.
fn availability_multiplier(stat: &PlayerStatLine, cfg: &EngineConfig) -> f64 {
    match stat.chance_of_playing {
        Some(c) if c < cfg.scoring.availability_cutoff => 0.0,
        Some(c) => f64::from(c) / 100.0,
        None => cfg.scoring.default_availability,
    }
}

// ---------------------------------------------------------------------------
// Projection assembly
// ---------------------------------------------------------------------------

/// Project one player across the lookahead window. Returns `None` when no
/// rate estimate can be made.
fn project_player(
    stat: &PlayerStatLine,
    enriched: Option<&EnrichedStats>,
    history: Option<&[MatchSample]>,
    outlook: &FixtureOutlook,
    strengths: &StrengthModel,
    cfg: &EngineConfig,
) -> Option<PlayerProjection> {
    let rate = estimate_rates(stat, enriched, cfg)?;

    let season_ppm = stat.total_points as f64 / stat.starts.max(1) as f64;
    let form = form_trend(history, season_ppm, &cfg.form);
    let xmin = expected_minutes(stat, form, &cfg.expected_minutes);

    let availability = availability_multiplier(stat, cfg);
    let minutes_prob = (rate.avg_minutes / cfg.scoring.minutes_divisor).min(1.0);
    let cs_prob = strengths.cs_prob(stat.team);

    let mut rounds = Vec::with_capacity(outlook.projection_rounds as usize);
    for round in outlook.projection_window() {
        let slots = outlook.fixtures_for(stat.team, round);
        if slots.is_empty() {
            rounds.push(RoundProjection {
                round,
                points: 0.0,
                opponents: "-".into(),
                difficulty: 0.0,
                is_double: false,
                is_blank: true,
            });
            continue;
        }

        let mut points = 0.0;
        let mut labels = Vec::with_capacity(slots.len());
        let mut difficulty_sum = 0.0;
        for slot in slots {
            points += fixture_points_raw(
                &rate,
                stat.position,
                slot.difficulty,
                cs_prob,
                minutes_prob,
                cfg,
            ) * availability
                * minutes_prob;
            difficulty_sum += slot.difficulty;
            labels.push(format!(
                "{} ({})",
                strengths.short_name(slot.opponent),
                if slot.is_home { "H" } else { "A" }
            ));
        }

        rounds.push(RoundProjection {
            round,
            points,
            opponents: labels.join(", "),
            difficulty: difficulty_sum / slots.len() as f64,
            is_double: slots.len() >= 2,
            is_blank: false,
        });
    }

    let planning = cfg.horizon.planning_rounds as usize;
    let next_round_points = rounds.first().map(|r| r.points).unwrap_or(0.0);
    let next_four_points: f64 = rounds.iter().take(planning).map(|r| r.points).sum();
    let next_six_points: f64 = rounds.iter().map(|r| r.points).sum();

    let early_difficulties: Vec<f64> = rounds
        .iter()
        .take(planning)
        .filter(|r| !r.is_blank)
        .map(|r| r.difficulty)
        .collect();
    let avg_difficulty = if early_difficulties.is_empty() {
        1.0
    } else {
        early_difficulties.iter().sum::<f64>() / early_difficulties.len() as f64
    };

    Some(PlayerProjection {
        player: stat.id,
        name: stat.name.clone(),
        team: stat.team,
        position: stat.position,
        price: stat.price,
        ownership: stat.ownership,
        quality: rate.quality,
        goals_p90: rate.goals_p90,
        assists_p90: rate.assists_p90,
        avg_minutes: rate.avg_minutes,
        minutes: stat.minutes,
        starts: stat.starts,
        form,
        chance_of_playing: stat.chance_of_playing,
        price_trend: stat.price_trend,
        xmin,
        rounds,
        next_round_points,
        next_four_points,
        next_six_points,
        avg_difficulty,
    })
}

/// Project the whole player universe. Players without a usable sample are
/// skipped; the map is ordered by player id so every downstream iteration
/// is deterministic.
pub fn project_players(
    stats: &[PlayerStatLine],
    enrichment: &HashMap<PlayerId, EnrichedStats>,
    histories: &HashMap<PlayerId, Vec<MatchSample>>,
    outlook: &FixtureOutlook,
    strengths: &StrengthModel,
    cfg: &EngineConfig,
) -> BTreeMap<PlayerId, PlayerProjection> {
    let mut projections = BTreeMap::new();
    let mut skipped = 0usize;

    for stat in stats {
        let projection = project_player(
            stat,
            enrichment.get(&stat.id),
            histories.get(&stat.id).map(Vec::as_slice),
            outlook,
            strengths,
            cfg,
        );
        match projection {
            Some(p) => {
                projections.insert(stat.id, p);
            }
            None => skipped += 1,
        }
    }

    debug!(
        projected = projections.len(),
        skipped, "player projections computed"
    );
    projections
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::model::{Fixture, PlayerStatus, Team, TeamMatchXg};
    use crate::projection::fixtures::build_fixture_outlook;
    use crate::projection::strength::build_strength_model;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn stat(id: PlayerId, team: TeamId, position: Position) -> PlayerStatLine {
        PlayerStatLine {
            id,
            name: format!("Player {id}"),
            team,
            position,
            minutes: 900,
            starts: 10,
            goals: 5,
            assists: 3,
            total_points: 50,
            price: 7.0,
            ownership: 12.0,
            status: PlayerStatus::Available,
            chance_of_playing: None,
            news: String::new(),
            price_trend: PriceTrend::Flat,
        }
    }

    fn forward_rate(goals_p90: f64, assists_p90: f64) -> RateEstimate {
        RateEstimate {
            goals_p90,
            assists_p90,
            avg_minutes: 90.0,
            quality: DataQuality::Approximated,
        }
    }

    // ---- Rate estimation ----

    #[test]
    fn enrichment_preferred_when_sample_sufficient() {
        let cfg = EngineConfig::default();
        let s = stat(1, 1, Position::Forward);
        let enriched = EnrichedStats {
            minutes: 900,
            matches: 10,
            xg: 8.0,
            xa: 2.0,
        };
        let rate = estimate_rates(&s, Some(&enriched), &cfg).unwrap();
        assert_eq!(rate.quality, DataQuality::Enriched);
        assert!(approx_eq(rate.goals_p90, 0.8));
        assert!(approx_eq(rate.assists_p90, 0.2));
        assert!(approx_eq(rate.avg_minutes, 90.0));
    }

    #[test]
    fn thin_enrichment_falls_back_to_raw_totals() {
        let cfg = EngineConfig::default();
        let s = stat(1, 1, Position::Forward);
        let enriched = EnrichedStats {
            minutes: 45,
            matches: 1,
            xg: 1.0,
            xa: 0.0,
        };
        let rate = estimate_rates(&s, Some(&enriched), &cfg).unwrap();
        assert_eq!(rate.quality, DataQuality::Approximated);
        assert!(approx_eq(rate.goals_p90, 0.5));
    }

    #[test]
    fn insufficient_minutes_produce_no_estimate() {
        let cfg = EngineConfig::default();
        let mut s = stat(1, 1, Position::Forward);
        s.minutes = 60;
        assert!(estimate_rates(&s, None, &cfg).is_none());
    }

    // ---- Per-fixture scoring ----

    #[test]
    fn defender_with_no_involvement_scores_cs_plus_appearance() {
        // goals_p90 = assists_p90 = 0, cs_prob = 0.3, difficulty = 1.0,
        // full availability and minutes => 0.3 * 4 + 2 + 0 bonus = 3.2.
        let cfg = EngineConfig::default();
        let rate = RateEstimate {
            goals_p90: 0.0,
            assists_p90: 0.0,
            avg_minutes: 90.0,
            quality: DataQuality::Approximated,
        };
        let pts = fixture_points_raw(&rate, Position::Defender, 1.0, 0.3, 1.0, &cfg);
        assert!(approx_eq(pts, 3.2), "expected 3.2, got {pts}");
    }

    #[test]
    fn easier_fixture_lifts_attacking_points() {
        let cfg = EngineConfig::default();
        let rate = forward_rate(0.6, 0.2);
        let easy = fixture_points_raw(&rate, Position::Forward, 0.8, 0.2, 1.0, &cfg);
        let hard = fixture_points_raw(&rate, Position::Forward, 1.3, 0.2, 1.0, &cfg);
        assert!(easy > hard);
    }

    #[test]
    fn bonus_is_capped() {
        let cfg = EngineConfig::default();
        // Outlandish involvement rate: bonus basis far above the cap region.
        let rate = forward_rate(3.0, 1.5);
        let pts = fixture_points_raw(&rate, Position::Forward, 1.0, 0.0, 1.0, &cfg);
        // goal 3*4 + assist 1.5*3 + appearance 2 + capped bonus 3.
        assert!(approx_eq(pts, 12.0 + 4.5 + 2.0 + 3.0));
    }

    #[test]
    fn low_minutes_probability_reduces_appearance_points() {
        let cfg = EngineConfig::default();
        let rate = RateEstimate {
            goals_p90: 0.0,
            assists_p90: 0.0,
            avg_minutes: 30.0,
            quality: DataQuality::Approximated,
        };
        // minutes_prob 30/70 ≈ 0.43 < 0.6 threshold: appearance drops to 1.
        let pts = fixture_points_raw(&rate, Position::Forward, 1.0, 0.0, 30.0 / 70.0, &cfg);
        assert!(approx_eq(pts, 1.0));
    }

    // ---- Full projection ----

    /// Two neutral teams playing each other every round.
    fn simple_world() -> (StrengthModel, FixtureOutlook) {
        let cfg = EngineConfig::default();
        let teams: Vec<Team> = (1..=2)
            .map(|id| Team {
                id,
                name: format!("Team {id}"),
                short_name: format!("T{id}"),
            })
            .collect();
        let mut history = HashMap::new();
        for id in 1..=2 {
            history.insert(
                id,
                vec![TeamMatchXg {
                    xg_for: 1.3,
                    xg_against: 1.3,
                }],
            );
        }
        let strengths = build_strength_model(&teams, &history, &cfg.strength);
        let fixtures: Vec<Fixture> = (1..=10)
            .map(|round| Fixture {
                round: Some(round),
                home: 1,
                away: 2,
                finished: false,
                home_goals: None,
                away_goals: None,
            })
            .collect();
        let outlook = build_fixture_outlook(&fixtures, &strengths, 1, &cfg.horizon, &cfg.difficulty);
        (strengths, outlook)
    }

    #[test]
    fn unavailable_player_projects_zero_everywhere() {
        let cfg = EngineConfig::default();
        let (strengths, outlook) = simple_world();
        let mut s = stat(1, 1, Position::Forward);
        s.chance_of_playing = Some(40);

        let p = project_player(&s, None, None, &outlook, &strengths, &cfg).unwrap();
        assert!(approx_eq(p.next_six_points, 0.0));
        for round in &p.rounds {
            assert!(approx_eq(round.points, 0.0));
        }
    }

    #[test]
    fn window_has_exactly_projection_rounds_entries() {
        let cfg = EngineConfig::default();
        let (strengths, outlook) = simple_world();
        let s = stat(1, 1, Position::Midfielder);
        let p = project_player(&s, None, None, &outlook, &strengths, &cfg).unwrap();
        assert_eq!(p.rounds.len(), 6);
        assert!(approx_eq(
            p.next_four_points,
            p.rounds.iter().take(4).map(|r| r.points).sum::<f64>()
        ));
        assert!(approx_eq(
            p.next_six_points,
            p.rounds.iter().map(|r| r.points).sum::<f64>()
        ));
        assert!(approx_eq(p.next_round_points, p.rounds[0].points));
    }

    #[test]
    fn blank_rounds_record_zero_points_and_difficulty() {
        let cfg = EngineConfig::default();
        let teams: Vec<Team> = (1..=4)
            .map(|id| Team {
                id,
                name: format!("Team {id}"),
                short_name: format!("T{id}"),
            })
            .collect();
        let strengths = build_strength_model(&teams, &HashMap::new(), &cfg.strength);
        // Team 1 only plays in round 1; rounds 2-6 are blanks for it.
        let fixtures = vec![
            Fixture {
                round: Some(1),
                home: 1,
                away: 2,
                finished: false,
                home_goals: None,
                away_goals: None,
            },
            Fixture {
                round: Some(2),
                home: 3,
                away: 4,
                finished: false,
                home_goals: None,
                away_goals: None,
            },
        ];
        let outlook = build_fixture_outlook(&fixtures, &strengths, 1, &cfg.horizon, &cfg.difficulty);
        let s = stat(1, 1, Position::Midfielder);
        let p = project_player(&s, None, None, &outlook, &strengths, &cfg).unwrap();

        assert!(!p.rounds[0].is_blank);
        for round in &p.rounds[1..] {
            assert!(round.is_blank);
            assert!(approx_eq(round.points, 0.0));
            assert!(approx_eq(round.difficulty, 0.0));
            assert_eq!(round.opponents, "-");
        }
    }

    #[test]
    fn double_round_sums_both_fixtures() {
        let cfg = EngineConfig::default();
        let teams: Vec<Team> = (1..=4)
            .map(|id| Team {
                id,
                name: format!("Team {id}"),
                short_name: format!("T{id}"),
            })
            .collect();
        let strengths = build_strength_model(&teams, &HashMap::new(), &cfg.strength);
        let make = |round, home, away| Fixture {
            round: Some(round),
            home,
            away,
            finished: false,
            home_goals: None,
            away_goals: None,
        };
        // Round 1: team 1 plays home and away against neutral opponents.
        let fixtures = vec![make(1, 1, 2), make(1, 3, 1), make(1, 2, 4)];
        let outlook = build_fixture_outlook(&fixtures, &strengths, 1, &cfg.horizon, &cfg.difficulty);
        let s = stat(1, 1, Position::Forward);
        let p = project_player(&s, None, None, &outlook, &strengths, &cfg).unwrap();

        let first = &p.rounds[0];
        assert!(first.is_double);
        assert!(first.opponents.contains(','));

        // The double total equals the sum of the two single-fixture values.
        let rate = RateEstimate {
            goals_p90: 0.5,
            assists_p90: 0.3,
            avg_minutes: 90.0,
            quality: DataQuality::Approximated,
        };
        let minutes_prob: f64 = 1.0;
        let availability = cfg.scoring.default_availability;
        let home = fixture_points_raw(&rate, Position::Forward, 0.9, 0.25, minutes_prob, &cfg);
        let away = fixture_points_raw(&rate, Position::Forward, 1.1, 0.25, minutes_prob, &cfg);
        let expected = (home + away) * availability * minutes_prob;
        assert!(
            approx_eq(first.points, expected),
            "expected {expected}, got {}",
            first.points
        );
    }

    #[test]
    fn projections_skip_thin_samples_without_error() {
        let cfg = EngineConfig::default();
        let (strengths, outlook) = simple_world();
        let mut thin = stat(2, 1, Position::Forward);
        thin.minutes = 30;
        let stats = vec![stat(1, 1, Position::Forward), thin];

        let projections = project_players(
            &stats,
            &HashMap::new(),
            &HashMap::new(),
            &outlook,
            &strengths,
            &cfg,
        );
        assert!(projections.contains_key(&1));
        assert!(!projections.contains_key(&2));
    }
}
