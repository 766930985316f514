// Captain selector with differential/risk analysis.
//
// Compares every active squad candidate against the "template" captain (the
// best of the highest-owned premium players league-wide): upside is weighted
// by the share of the field that does not own the template, downside by the
// template's estimated captaincy share. High-ownership players are captained
// disproportionately often, so ownership maps to captaincy share through
// banded multipliers.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::advice::ranking::rank_desc;
use crate::advice::SquadMember;
use crate::config::{CaptainConfig, EngineConfig};
use crate::model::PlayerId;
use crate::projection::points::PlayerProjection;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CaptainClass {
    Safe,
    HighUpside,
    Risky,
    Balanced,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaptainCandidate {
    pub player: PlayerId,
    pub name: String,
    pub projected_points: f64,
    pub ownership: f64,
    /// Estimated share of the field captaining this player, percent.
    pub estimated_captaincy: f64,
    pub upside: f64,
    pub downside: f64,
    pub class: CaptainClass,
    pub is_double: bool,
    pub opponents: String,
}

/// The captaincy advice for the next round.
#[derive(Debug, Clone, Serialize)]
pub struct CaptainAdvice {
    pub safe_pick: Option<CaptainCandidate>,
    /// Best low-ownership option, ranked purely on raw projection.
    pub differential: Option<CaptainCandidate>,
    pub candidates: Vec<CaptainCandidate>,
}

// ---------------------------------------------------------------------------
// Captaincy share estimation
// ---------------------------------------------------------------------------

/// Estimated captained-by percentage from ownership. Bands are matched top
/// down; the estimate never exceeds 100%.
fn estimated_captaincy(ownership: f64, cfg: &CaptainConfig) -> f64 {
    let multiplier = cfg
        .bands
        .iter()
        .find(|band| ownership >= band.min)
        .map(|band| band.multiplier)
        .unwrap_or(0.0);
    (ownership * multiplier).min(100.0)
}

// ---------------------------------------------------------------------------
// Template pool
// ---------------------------------------------------------------------------

/// The template captain: the best next-round projection among the top-N
/// highest-owned premium players. Returns (points, ownership, captaincy
/// share) or zeros when no premium players exist.
fn template_baseline(
    projections: &BTreeMap<PlayerId, PlayerProjection>,
    cfg: &CaptainConfig,
) -> (f64, f64, f64) {
    let premium = projections
        .values()
        .filter(|p| p.price >= cfg.premium_price);
    let mut pool = rank_desc(premium, |p| p.ownership);
    pool.truncate(cfg.template_pool_size);

    let Some(template) = pool.iter().copied().max_by(|a, b| {
        a.next_round_points
            .partial_cmp(&b.next_round_points)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.player.cmp(&a.player))
    }) else {
        return (0.0, 0.0, 0.0);
    };

    (
        template.next_round_points,
        template.ownership,
        estimated_captaincy(template.ownership, cfg),
    )
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Rank the manager's captaincy options for the next round.
pub fn select_captain(
    squad: &[SquadMember],
    projections: &BTreeMap<PlayerId, PlayerProjection>,
    cfg: &EngineConfig,
) -> CaptainAdvice {
    let c = &cfg.captain;

    let (template_points, template_ownership, template_share) =
        template_baseline(projections, c);
    debug!(
        template_points,
        template_ownership, "template captain baseline"
    );

    let mut candidates: Vec<CaptainCandidate> = squad
        .iter()
        .filter(|m| m.is_starter())
        .filter_map(|m| projections.get(&m.player))
        .filter(|p| p.next_round_points > c.min_projection)
        .map(|p| {
            let points = p.next_round_points;
            let upside =
                (points - template_points).max(0.0) * (1.0 - template_ownership / 100.0);
            let downside = (template_points - points).max(0.0) * (template_share / 100.0);

            // Upside and downside are mutually exclusive for point
            // estimates, so the aggressive class is checked first.
            let class = if upside >= c.upside_threshold {
                CaptainClass::HighUpside
            } else if downside <= c.safe_downside {
                CaptainClass::Safe
            } else if downside >= c.risky_downside {
                CaptainClass::Risky
            } else {
                CaptainClass::Balanced
            };

            let first_round = p.rounds.first();
            CaptainCandidate {
                player: p.player,
                name: p.name.clone(),
                projected_points: points,
                ownership: p.ownership,
                estimated_captaincy: estimated_captaincy(p.ownership, c),
                upside,
                downside,
                class,
                is_double: first_round.map(|r| r.is_double).unwrap_or(false),
                opponents: first_round
                    .map(|r| r.opponents.clone())
                    .unwrap_or_else(|| "-".into()),
            }
        })
        .collect();

    // Doubles outrank singles, then raw projection.
    candidates.sort_by(|a, b| {
        b.is_double
            .cmp(&a.is_double)
            .then(
                b.projected_points
                    .partial_cmp(&a.projected_points)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(a.player.cmp(&b.player))
    });

    let safe_pick = candidates
        .iter()
        .find(|c| c.class == CaptainClass::Safe)
        .cloned();

    let differential = candidates
        .iter()
        .filter(|cand| cand.ownership < c.differential_max_ownership)
        .max_by(|a, b| {
            a.projected_points
                .partial_cmp(&b.projected_points)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.player.cmp(&a.player))
        })
        .cloned();

    candidates.truncate(c.shortlist_size);

    CaptainAdvice {
        safe_pick,
        differential,
        candidates,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::model::{DataQuality, FormTrend, Position, PriceTrend, TeamId};
    use crate::projection::points::RoundProjection;

    fn member(player: PlayerId, multiplier: u32) -> SquadMember {
        SquadMember {
            player,
            name: format!("P{player}"),
            team: 1,
            position: Position::Midfielder,
            multiplier,
            selling_price: 8.0,
        }
    }

    fn projection(
        player: PlayerId,
        team: TeamId,
        next_round: f64,
        price: f64,
        ownership: f64,
    ) -> PlayerProjection {
        let rounds = vec![RoundProjection {
            round: 1,
            points: next_round,
            opponents: "OPP (H)".into(),
            difficulty: 1.0,
            is_double: false,
            is_blank: false,
        }];
        PlayerProjection {
            player,
            name: format!("P{player}"),
            team,
            position: Position::Midfielder,
            price,
            ownership,
            quality: DataQuality::Approximated,
            goals_p90: 0.4,
            assists_p90: 0.2,
            avg_minutes: 90.0,
            minutes: 900,
            starts: 10,
            form: FormTrend::Steady,
            chance_of_playing: None,
            price_trend: PriceTrend::Flat,
            xmin: 90.0,
            rounds,
            next_round_points: next_round,
            next_four_points: next_round * 4.0,
            next_six_points: next_round * 6.0,
            avg_difficulty: 1.0,
        }
    }

    #[test]
    fn captaincy_share_uses_ownership_bands() {
        let cfg = EngineConfig::default().captain;
        assert!((estimated_captaincy(60.0, &cfg) - 100.0).abs() < 1e-9); // capped
        assert!((estimated_captaincy(40.0, &cfg) - 56.0).abs() < 1e-9);
        assert!((estimated_captaincy(20.0, &cfg) - 20.0).abs() < 1e-9);
        assert!((estimated_captaincy(10.0, &cfg) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn bench_players_are_never_candidates() {
        let cfg = EngineConfig::default();
        let squad = vec![member(1, 1), member(2, 0)];
        let mut projections = BTreeMap::new();
        projections.insert(1, projection(1, 1, 5.0, 9.0, 30.0));
        // The bench player projects far higher but has multiplier 0.
        projections.insert(2, projection(2, 1, 12.0, 12.0, 40.0));

        let advice = select_captain(&squad, &projections, &cfg);
        assert_eq!(advice.candidates.len(), 1);
        assert_eq!(advice.candidates[0].player, 1);
    }

    #[test]
    fn low_projection_players_are_filtered() {
        let cfg = EngineConfig::default();
        let squad = vec![member(1, 1)];
        let mut projections = BTreeMap::new();
        projections.insert(1, projection(1, 1, 1.5, 9.0, 30.0));

        let advice = select_captain(&squad, &projections, &cfg);
        assert!(advice.candidates.is_empty());
        assert!(advice.safe_pick.is_none());
        assert!(advice.differential.is_none());
    }

    #[test]
    fn owning_the_template_is_safe() {
        let cfg = EngineConfig::default();
        let squad = vec![member(1, 1)];
        let mut projections = BTreeMap::new();
        // Player 1 is the highest-owned premium player: template is in-squad.
        projections.insert(1, projection(1, 1, 8.0, 12.0, 55.0));
        projections.insert(2, projection(2, 2, 7.0, 11.0, 35.0));

        let advice = select_captain(&squad, &projections, &cfg);
        let safe = advice.safe_pick.expect("template owner is safe");
        assert_eq!(safe.player, 1);
        assert!((safe.downside - 0.0).abs() < 1e-9);
        assert_eq!(safe.class, CaptainClass::Safe);
    }

    #[test]
    fn trailing_the_template_far_enough_is_risky() {
        let cfg = EngineConfig::default();
        let squad = vec![member(1, 1)];
        let mut projections = BTreeMap::new();
        // Template: 10-point projection at 60% ownership (share capped 100%).
        projections.insert(9, projection(9, 2, 10.0, 12.0, 60.0));
        // Our captain option trails by 4 points: downside 4.0.
        projections.insert(1, projection(1, 1, 6.0, 9.0, 25.0));

        let advice = select_captain(&squad, &projections, &cfg);
        let candidate = &advice.candidates[0];
        assert!((candidate.downside - 4.0).abs() < 1e-9);
        assert_eq!(candidate.class, CaptainClass::Risky);
        assert!(advice.safe_pick.is_none());
    }

    #[test]
    fn beating_a_lowly_owned_template_is_high_upside() {
        let cfg = EngineConfig::default();
        let squad = vec![member(1, 1), member(2, 1)];
        let mut projections = BTreeMap::new();
        // Template at modest ownership: most of the field doesn't own it.
        projections.insert(9, projection(9, 2, 6.0, 12.0, 30.0));
        // Candidate 1 beats the template by 4: upside 4 * 0.7 = 2.8.
        // Both candidates priced below the premium floor so neither joins
        // the template pool.
        projections.insert(1, projection(1, 1, 10.0, 7.5, 15.0));
        // Candidate 2 trails slightly: downside 1 * 0.42 = 0.42, safe.
        projections.insert(2, projection(2, 1, 5.0, 7.0, 10.0));

        let advice = select_captain(&squad, &projections, &cfg);
        let leader = advice
            .candidates
            .iter()
            .find(|c| c.player == 1)
            .expect("candidate 1 present");
        assert!((leader.upside - 2.8).abs() < 1e-9);
        assert_eq!(leader.class, CaptainClass::HighUpside);
        let runner_up = advice
            .candidates
            .iter()
            .find(|c| c.player == 2)
            .expect("candidate 2 present");
        assert_eq!(runner_up.class, CaptainClass::Safe);
    }

    #[test]
    fn differential_is_best_projection_under_ownership_cap() {
        let cfg = EngineConfig::default();
        let squad = vec![member(1, 1), member(2, 1), member(3, 1)];
        let mut projections = BTreeMap::new();
        projections.insert(1, projection(1, 1, 9.0, 9.0, 45.0)); // too owned
        projections.insert(2, projection(2, 1, 6.0, 7.0, 12.0));
        projections.insert(3, projection(3, 1, 7.5, 7.5, 18.0));

        let advice = select_captain(&squad, &projections, &cfg);
        let differential = advice.differential.expect("two low-owned candidates");
        assert_eq!(differential.player, 3);
    }

    #[test]
    fn double_round_candidate_outranks_higher_single_projection() {
        let cfg = EngineConfig::default();
        let squad = vec![member(1, 1), member(2, 1)];
        let mut projections = BTreeMap::new();
        projections.insert(1, projection(1, 1, 9.0, 9.0, 40.0));
        let mut doubled = projection(2, 2, 8.0, 9.0, 40.0);
        doubled.rounds[0].is_double = true;
        projections.insert(2, doubled);

        let advice = select_captain(&squad, &projections, &cfg);
        assert_eq!(advice.candidates[0].player, 2);
    }
}
