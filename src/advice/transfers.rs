// Transfer recommender.
//
// Scores every starter on independently-triggered sell signals, then hunts
// the projection universe for the best affordable same-position replacement
// under the squad-building rules (team cap, budget, starter reliability,
// data quality). Greedy per slot over the planning horizon; no multi-round
// sequencing.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::advice::SquadMember;
use crate::config::EngineConfig;
use crate::model::{DataQuality, FormTrend, PlayerId, Position};
use crate::projection::fixtures::FixtureOutlook;
use crate::projection::points::PlayerProjection;

// ---------------------------------------------------------------------------
// Output type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct TransferRecommendation {
    pub out_player: PlayerId,
    pub out_name: String,
    pub in_player: PlayerId,
    pub in_name: String,
    pub position: Position,
    pub in_price: f64,
    pub gain_next_round: f64,
    pub gain_next_four: f64,
    pub score: f64,
    /// Whether the projected gain justifies a points hit.
    pub worth_hit: bool,
    /// Why the outgoing player was flagged.
    pub reasons: Vec<String>,
}

// ---------------------------------------------------------------------------
// Sell-side scoring
// ---------------------------------------------------------------------------

struct SellCase<'a> {
    member: &'a SquadMember,
    score: f64,
    reasons: Vec<String>,
    next_round: f64,
    next_four: f64,
}

fn score_sell_case<'a>(
    member: &'a SquadMember,
    projections: &BTreeMap<PlayerId, PlayerProjection>,
    outlook: &FixtureOutlook,
    cfg: &EngineConfig,
) -> SellCase<'a> {
    let t = &cfg.transfers;
    let mut score = 0.0;
    let mut reasons = Vec::new();

    let projection = projections.get(&member.player);
    let next_four = projection.map(|p| p.next_four_points).unwrap_or(0.0);
    let next_round = projection.map(|p| p.next_round_points).unwrap_or(0.0);

    if next_four < t.min_projection {
        score += t.weight_low_projection;
        reasons.push(format!(
            "projecting only {next_four:.1} points over the planning window"
        ));
    }
    if let Some(p) = projection {
        if p.form == FormTrend::Cold {
            score += t.weight_cold_form;
            reasons.push("cold form".into());
        }
        if let Some(chance) = p.chance_of_playing {
            if f64::from(chance) < t.availability_floor {
                score += t.weight_availability;
                reasons.push(format!("availability at {chance}%"));
            }
        }
        if p.avg_difficulty > t.difficulty_ceiling {
            score += t.weight_difficulty;
            reasons.push(format!("difficult run (avg {:.2})", p.avg_difficulty));
        }
    }
    if outlook.has_blank_within(member.team, cfg.horizon.planning_rounds) {
        score += t.weight_blank;
        reasons.push("blank round in the planning window".into());
    }

    SellCase {
        member,
        score,
        reasons,
        next_round,
        next_four,
    }
}

// ---------------------------------------------------------------------------
// Buy-side search
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn find_replacement<'a>(
    sell: &SellCase<'_>,
    squad: &[SquadMember],
    projections: &'a BTreeMap<PlayerId, PlayerProjection>,
    outlook: &FixtureOutlook,
    bank: f64,
    enriched_available: bool,
    already_recommended: &[PlayerId],
    cfg: &EngineConfig,
) -> Option<(&'a PlayerProjection, f64)> {
    let t = &cfg.transfers;
    let budget = sell.member.selling_price + bank;

    let mut best: Option<(&PlayerProjection, f64)> = None;
    for candidate in projections.values() {
        if candidate.position != sell.member.position {
            continue;
        }
        if squad.iter().any(|m| m.player == candidate.player) {
            continue;
        }
        if already_recommended.contains(&candidate.player) {
            continue;
        }
        if candidate.price > budget {
            continue;
        }
        // Team cap: the outgoing player frees their own club slot.
        let same_team = squad
            .iter()
            .filter(|m| m.team == candidate.team && m.player != sell.member.player)
            .count();
        if same_team + 1 > t.team_cap {
            continue;
        }
        // Only established starters; rotation lottery tickets are excluded.
        if candidate.starts < t.min_buyer_starts || candidate.minutes < t.min_buyer_minutes {
            continue;
        }
        if candidate.form == FormTrend::Cold {
            continue;
        }
        if enriched_available && candidate.quality == DataQuality::Approximated {
            continue;
        }
        if candidate.next_four_points < t.min_buyer_projection {
            continue;
        }
        let gain = candidate.next_four_points - sell.next_four;
        if gain < t.min_gain {
            continue;
        }

        let mut score = gain;
        if candidate.form == FormTrend::Hot {
            score += t.hot_form_bonus;
        }
        if outlook.has_double_within(candidate.team, cfg.horizon.projection_rounds) {
            score += t.double_bonus;
        }
        if candidate.avg_difficulty < t.easy_fixture_ceiling {
            score += t.easy_fixture_bonus;
        }
        score -= (candidate.ownership - t.ownership_penalty_start).max(0.0)
            * t.ownership_penalty_rate;

        let better = match best {
            Some((current, current_score)) => {
                score > current_score
                    || (score == current_score && candidate.player < current.player)
            }
            None => true,
        };
        if better {
            best = Some((candidate, score));
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Recommend up to `max_moves` transfers for the squad. Only starters are
/// sell candidates; an empty result means no move clears the thresholds.
pub fn recommend_transfers(
    squad: &[SquadMember],
    projections: &BTreeMap<PlayerId, PlayerProjection>,
    outlook: &FixtureOutlook,
    bank: f64,
    cfg: &EngineConfig,
) -> Vec<TransferRecommendation> {
    let t = &cfg.transfers;

    let enriched_available = projections
        .values()
        .any(|p| p.quality == DataQuality::Enriched);

    let mut sell_cases: Vec<SellCase<'_>> = squad
        .iter()
        .filter(|m| m.is_starter())
        .map(|m| score_sell_case(m, projections, outlook, cfg))
        .collect();

    // Worst first: highest sell score, then lowest projection.
    sell_cases.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                a.next_four
                    .partial_cmp(&b.next_four)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(a.member.player.cmp(&b.member.player))
    });

    let mut recommendations = Vec::new();
    let mut already_recommended: Vec<PlayerId> = Vec::new();

    for sell in sell_cases
        .iter()
        .filter(|c| c.score >= t.min_sell_score)
        .take(t.max_moves)
    {
        let Some((buyer, score)) = find_replacement(
            sell,
            squad,
            projections,
            outlook,
            bank,
            enriched_available,
            &already_recommended,
            cfg,
        ) else {
            debug!(
                out = %sell.member.name,
                "no replacement cleared the filters"
            );
            continue;
        };

        let gain_next_four = buyer.next_four_points - sell.next_four;
        let worth_hit =
            gain_next_four > t.points_per_hit * cfg.horizon.planning_rounds as f64 / t.hit_horizon_rounds;

        already_recommended.push(buyer.player);
        recommendations.push(TransferRecommendation {
            out_player: sell.member.player,
            out_name: sell.member.name.clone(),
            in_player: buyer.player,
            in_name: buyer.name.clone(),
            position: sell.member.position,
            in_price: buyer.price,
            gain_next_round: buyer.next_round_points - sell.next_round,
            gain_next_four,
            score,
            worth_hit,
            reasons: sell.reasons.clone(),
        });
    }

    // Strongest move first.
    recommendations.sort_by(|a, b| {
        b.gain_next_four
            .partial_cmp(&a.gain_next_four)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.out_player.cmp(&b.out_player))
    });
    recommendations
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
