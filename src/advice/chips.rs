// Chip strategy optimizer.
//
// Four independent sub-analyses over the lookahead window, each gated by
// which chips the manager still holds and each with its own minimum score.
// Emitting nothing for an unavailable or untriggered chip is the expected
// outcome, not a failure.
//
// TODO: double-round fixtures are already summed inside the projections, and
// the bench-boost/triple-captain scores multiply doubles again on top; the
// compounded bonus needs a product decision before changing either side.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::advice::SquadMember;
use crate::config::EngineConfig;
use crate::model::{Chip, FormTrend, PlayerId, PriceTrend, Round};
use crate::projection::fixtures::FixtureOutlook;
use crate::projection::points::PlayerProjection;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChipRecommendation {
    pub chip: Chip,
    pub round: Round,
    pub score: f64,
    pub confidence: Confidence,
    /// Target player for Triple Captain, absent for the squad-level chips.
    pub player: Option<PlayerId>,
    pub player_name: Option<String>,
    pub reasons: Vec<String>,
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Fixture-ease factor from a round's average difficulty: 1.0 for a neutral
/// fixture, above it for easy runs, bounded below at zero.
fn ease_factor(avg_difficulty: f64) -> f64 {
    (2.0 - avg_difficulty).max(0.0)
}

fn squad_projection<'a>(
    member: &SquadMember,
    projections: &'a BTreeMap<PlayerId, PlayerProjection>,
) -> Option<&'a PlayerProjection> {
    projections.get(&member.player)
}

// ---------------------------------------------------------------------------
// Bench Boost
// ---------------------------------------------------------------------------

fn analyze_bench_boost(
    squad: &[SquadMember],
    projections: &BTreeMap<PlayerId, PlayerProjection>,
    outlook: &FixtureOutlook,
    cfg: &EngineConfig,
) -> Option<ChipRecommendation> {
    let c = &cfg.chips;
    let full_match = cfg.expected_minutes.full_match;
    let bench: Vec<&SquadMember> = squad.iter().filter(|m| !m.is_starter()).collect();
    if bench.is_empty() {
        return None;
    }

    let mut best: Option<(Round, f64, Vec<String>)> = None;
    for round in outlook.projection_window() {
        let mut bench_effective = 0.0;
        let mut bench_xmin = 0.0;
        let mut difficulties = Vec::new();
        for member in &bench {
            let Some(proj) = squad_projection(member, projections) else {
                continue;
            };
            bench_effective += proj.points_in_round(round) * (proj.xmin / full_match);
            bench_xmin += proj.xmin;
            if let Some(r) = proj.round_projection(round) {
                if !r.is_blank {
                    difficulties.push(r.difficulty);
                }
            }
        }
        if difficulties.is_empty() {
            continue; // bench fully blanked: boosting here is pointless
        }
        let avg_difficulty = difficulties.iter().sum::<f64>() / difficulties.len() as f64;
        let minutes_factor = bench_xmin / (bench.len() as f64 * full_match);

        let doubles = squad
            .iter()
            .filter(|m| outlook.team_doubles(m.team).contains(&round))
            .count();

        let score = bench_effective * ease_factor(avg_difficulty) * minutes_factor
            + c.bench_boost_double_bonus * doubles as f64;

        let better = best.as_ref().map(|(_, s, _)| score > *s).unwrap_or(true);
        if better {
            let mut reasons = vec![format!(
                "bench projecting {bench_effective:.1} effective points"
            )];
            if doubles > 0 {
                reasons.push(format!("{doubles} squad players double"));
            }
            best = Some((round, score, reasons));
        }
    }

    let (round, score, reasons) = best?;
    if score < c.bench_boost_threshold {
        return None;
    }
    let doubles_heavy = reasons.iter().any(|r| r.contains("double"));
    Some(ChipRecommendation {
        chip: Chip::BenchBoost,
        round,
        score,
        confidence: if doubles_heavy || score >= 1.5 * c.bench_boost_threshold {
            Confidence::High
        } else {
            Confidence::Medium
        },
        player: None,
        player_name: None,
        reasons,
    })
}

// ---------------------------------------------------------------------------
// Triple Captain
// ---------------------------------------------------------------------------

fn analyze_triple_captain(
    squad: &[SquadMember],
    projections: &BTreeMap<PlayerId, PlayerProjection>,
    outlook: &FixtureOutlook,
    cfg: &EngineConfig,
) -> Option<ChipRecommendation> {
    let c = &cfg.chips;
    let full_match = cfg.expected_minutes.full_match;

    let mut best: Option<(Round, &PlayerProjection, bool, f64)> = None;
    for member in squad {
        let Some(proj) = squad_projection(member, projections) else {
            continue;
        };
        if proj.price < c.triple_captain_price_floor {
            continue;
        }
        for round in outlook.projection_window() {
            let Some(r) = proj.round_projection(round) else {
                continue;
            };
            if r.is_blank {
                continue;
            }
            let home = outlook
                .fixtures_for(member.team, round)
                .iter()
                .any(|slot| slot.is_home);
            let mut score = r.points * 3.0 * ease_factor(r.difficulty) * (proj.xmin / full_match);
            if home {
                score *= c.triple_captain_home_bonus;
            }
            if r.is_double {
                score *= c.triple_captain_double_factor;
            }

            let better = match &best {
                Some((_, current, _, current_score)) => {
                    score > *current_score
                        || (score == *current_score && proj.player < current.player)
                }
                None => true,
            };
            if better {
                best = Some((round, proj, r.is_double, score));
            }
        }
    }

    let (round, proj, is_double, score) = best?;
    if score < c.triple_captain_threshold {
        return None;
    }
    let mut reasons = vec![format!(
        "{} projecting {:.1} points in round {round}",
        proj.name,
        proj.points_in_round(round)
    )];
    if is_double {
        reasons.push("double round".into());
    }
    Some(ChipRecommendation {
        chip: Chip::TripleCaptain,
        round,
        score,
        confidence: if is_double {
            Confidence::High
        } else {
            Confidence::Medium
        },
        player: Some(proj.player),
        player_name: Some(proj.name.clone()),
        reasons,
    })
}

// ---------------------------------------------------------------------------
// Free Hit
// ---------------------------------------------------------------------------

fn analyze_free_hit(
    squad: &[SquadMember],
    projections: &BTreeMap<PlayerId, PlayerProjection>,
    outlook: &FixtureOutlook,
    cfg: &EngineConfig,
) -> Option<ChipRecommendation> {
    let c = &cfg.chips;

    let mut best: Option<(Round, usize, f64)> = None;
    for round in outlook.projection_window() {
        let missing = squad
            .iter()
            .filter(|m| outlook.fixtures_for(m.team, round).is_empty())
            .count();

        let mut difficulties = Vec::new();
        for member in squad {
            if let Some(proj) = squad_projection(member, projections) {
                if let Some(r) = proj.round_projection(round) {
                    if !r.is_blank {
                        difficulties.push(r.difficulty);
                    }
                }
            }
        }
        let avg_difficulty = if difficulties.is_empty() {
            0.0
        } else {
            difficulties.iter().sum::<f64>() / difficulties.len() as f64
        };

        let score = missing as f64 * c.free_hit_missing_weight
            + (avg_difficulty - 1.0).max(0.0) * c.free_hit_difficulty_weight;

        let better = best.as_ref().map(|(_, _, s)| score > *s).unwrap_or(true);
        if better {
            best = Some((round, missing, score));
        }
    }

    let (round, missing, score) = best?;
    if score < c.free_hit_threshold {
        return None;
    }
    Some(ChipRecommendation {
        chip: Chip::FreeHit,
        round,
        score,
        confidence: if missing >= c.free_hit_high_confidence_missing {
            Confidence::High
        } else {
            Confidence::Medium
        },
        player: None,
        player_name: None,
        reasons: vec![format!("{missing} squad players without a fixture")],
    })
}

// ---------------------------------------------------------------------------
// Wildcard
// ---------------------------------------------------------------------------

fn analyze_wildcard(
    squad: &[SquadMember],
    projections: &BTreeMap<PlayerId, PlayerProjection>,
    outlook: &FixtureOutlook,
    cfg: &EngineConfig,
) -> Option<ChipRecommendation> {
    let c = &cfg.chips;
    let mut score = 0.0;
    let mut reasons = Vec::new();

    let squad_projs: Vec<&PlayerProjection> = squad
        .iter()
        .filter_map(|m| squad_projection(m, projections))
        .collect();

    let cold = squad_projs
        .iter()
        .filter(|p| p.form == FormTrend::Cold)
        .count();
    if cold >= c.wildcard_cold_players {
        score += c.wildcard_cold_weight;
        reasons.push(format!("{cold} players in cold form"));
    }

    if !outlook.double_rounds.is_empty() {
        let covered = squad
            .iter()
            .filter(|m| !outlook.team_doubles(m.team).is_empty())
            .count();
        if covered < c.wildcard_double_coverage {
            score += c.wildcard_coverage_weight;
            reasons.push(format!("only {covered} players with a double round"));
        }
    }

    let flagged = squad_projs
        .iter()
        .filter(|p| {
            p.chance_of_playing
                .map(|chance| f64::from(chance) < cfg.transfers.availability_floor)
                .unwrap_or(false)
        })
        .count();
    if flagged >= c.wildcard_availability_players {
        score += c.wildcard_availability_weight;
        reasons.push(format!("{flagged} players with availability doubts"));
    }

    let falling = squad_projs
        .iter()
        .filter(|p| p.price_trend == PriceTrend::Falling)
        .count();
    if falling >= c.wildcard_price_fall_players {
        score += c.wildcard_price_fall_weight;
        reasons.push(format!("{falling} players losing value"));
    }

    if !squad_projs.is_empty() {
        let avg_difficulty = squad_projs.iter().map(|p| p.avg_difficulty).sum::<f64>()
            / squad_projs.len() as f64;
        if avg_difficulty > c.wildcard_difficulty_ceiling {
            score += c.wildcard_difficulty_weight;
            reasons.push(format!("squad-wide difficult run (avg {avg_difficulty:.2})"));
        }
    }

    if score < c.wildcard_threshold {
        return None;
    }

    // Play it one round before the nearest double so the rebuilt squad is in
    // place for it; with no double in sight, next round.
    let round = match outlook.next_double_round() {
        Some(double) => double.saturating_sub(1).max(outlook.start_round),
        None => outlook.start_round,
    };

    Some(ChipRecommendation {
        chip: Chip::Wildcard,
        round,
        score,
        confidence: if score >= 1.5 * c.wildcard_threshold {
            Confidence::High
        } else {
            Confidence::Medium
        },
        player: None,
        player_name: None,
        reasons,
    })
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Run every sub-analysis for the chips the manager still holds. Returns
/// 0-4 recommendations in a fixed chip order.
pub fn plan_chips(
    squad: &[SquadMember],
    projections: &BTreeMap<PlayerId, PlayerProjection>,
    outlook: &FixtureOutlook,
    available: &[Chip],
    cfg: &EngineConfig,
) -> Vec<ChipRecommendation> {
    let mut recommendations = Vec::new();
    for chip in Chip::ALL {
        if !available.contains(&chip) {
            continue;
        }
        let recommendation = match chip {
            Chip::BenchBoost => analyze_bench_boost(squad, projections, outlook, cfg),
            Chip::TripleCaptain => analyze_triple_captain(squad, projections, outlook, cfg),
            Chip::FreeHit => analyze_free_hit(squad, projections, outlook, cfg),
            Chip::Wildcard => analyze_wildcard(squad, projections, outlook, cfg),
        };
        match recommendation {
            Some(rec) => recommendations.push(rec),
            None => debug!(chip = chip.label(), "no recommendation cleared the threshold"),
        }
    }
    recommendations
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
