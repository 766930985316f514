// Starting-lineup optimizer.
//
// For each round in the lookahead window, partitions the 15-player squad
// into available and unavailable players, then enumerates the legal
// formations and keeps the XI with the highest summed effective points.
// Bench ordering and captain/vice selection fall out of the same ranking.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::advice::SquadMember;
use crate::config::EngineConfig;
use crate::model::{PlayerId, Position, Round};
use crate::projection::fixtures::FixtureOutlook;
use crate::projection::minutes::effective_points;
use crate::projection::points::PlayerProjection;

// ---------------------------------------------------------------------------
// Formations
// ---------------------------------------------------------------------------

/// Outfield shape of a legal XI (a goalkeeper is always implied).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Formation {
    pub defenders: u8,
    pub midfielders: u8,
    pub forwards: u8,
}

impl Formation {
    /// The eight legal formations.
    pub const LEGAL: [Formation; 8] = [
        Formation { defenders: 3, midfielders: 4, forwards: 3 },
        Formation { defenders: 3, midfielders: 5, forwards: 2 },
        Formation { defenders: 4, midfielders: 3, forwards: 3 },
        Formation { defenders: 4, midfielders: 4, forwards: 2 },
        Formation { defenders: 4, midfielders: 5, forwards: 1 },
        Formation { defenders: 5, midfielders: 2, forwards: 3 },
        Formation { defenders: 5, midfielders: 3, forwards: 2 },
        Formation { defenders: 5, midfielders: 4, forwards: 1 },
    ];

    pub fn label(&self) -> String {
        format!("{}-{}-{}", self.defenders, self.midfielders, self.forwards)
    }

    fn required(&self, position: Position) -> usize {
        match position {
            Position::Goalkeeper => 1,
            Position::Defender => self.defenders as usize,
            Position::Midfielder => self.midfielders as usize,
            Position::Forward => self.forwards as usize,
        }
    }
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BenchStatus {
    Available,
    Blank,
    Unlikely,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineupSlot {
    pub player: PlayerId,
    pub name: String,
    pub position: Position,
    pub projected_points: f64,
    pub effective_points: f64,
    pub xmin: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchSlot {
    pub player: PlayerId,
    pub name: String,
    pub position: Position,
    pub effective_points: f64,
    pub status: BenchStatus,
    pub order: u8,
}

/// The recommended XI for one round.
#[derive(Debug, Clone, Serialize)]
pub struct LineupPlan {
    pub round: Round,
    /// `None` when no legal formation could be filled and the XI is an
    /// unconstrained top-11 fallback.
    pub formation: Option<Formation>,
    pub starters: Vec<LineupSlot>,
    pub captain: Option<PlayerId>,
    pub vice_captain: Option<PlayerId>,
    pub bench: Vec<BenchSlot>,
    pub total_effective_points: f64,
    pub needs_attention: bool,
    pub alerts: Vec<String>,
}

// ---------------------------------------------------------------------------
// Internal candidate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Candidate {
    player: PlayerId,
    name: String,
    position: Position,
    projected: f64,
    effective: f64,
    xmin: f64,
    has_fixture: bool,
}

fn candidate_for(
    member: &SquadMember,
    projections: &BTreeMap<PlayerId, PlayerProjection>,
    outlook: &FixtureOutlook,
    round: Round,
    cfg: &EngineConfig,
) -> Candidate {
    match projections.get(&member.player) {
        Some(proj) => {
            let projected = proj.points_in_round(round);
            let has_fixture = proj
                .round_projection(round)
                .map(|r| !r.is_blank)
                .unwrap_or(false);
            Candidate {
                player: member.player,
                name: member.name.clone(),
                position: member.position,
                projected,
                effective: effective_points(projected, proj.xmin, &cfg.expected_minutes),
                xmin: proj.xmin,
                has_fixture,
            }
        }
        // No projectable sample: treat as zero expected contribution but
        // still report whether the club plays.
        None => Candidate {
            player: member.player,
            name: member.name.clone(),
            position: member.position,
            projected: 0.0,
            effective: 0.0,
            xmin: 0.0,
            has_fixture: !outlook.fixtures_for(member.team, round).is_empty(),
        },
    }
}

fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.effective
            .partial_cmp(&a.effective)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.player.cmp(&b.player))
    });
}

// ---------------------------------------------------------------------------
// Per-round optimization
// ---------------------------------------------------------------------------

fn plan_round(
    squad: &[SquadMember],
    projections: &BTreeMap<PlayerId, PlayerProjection>,
    outlook: &FixtureOutlook,
    round: Round,
    cfg: &EngineConfig,
) -> LineupPlan {
    let xm = &cfg.expected_minutes;

    let candidates: Vec<Candidate> = squad
        .iter()
        .map(|m| candidate_for(m, projections, outlook, round, cfg))
        .collect();

    // Partition: a player is selectable when their club plays and they can
    // be expected on the pitch for more than a token appearance.
    let (mut available, unavailable): (Vec<Candidate>, Vec<Candidate>) = candidates
        .iter()
        .cloned()
        .partition(|c| c.has_fixture && c.xmin >= xm.eligibility_floor);
    sort_candidates(&mut available);

    let mut by_position: BTreeMap<Position, Vec<&Candidate>> = BTreeMap::new();
    for candidate in &available {
        by_position.entry(candidate.position).or_default().push(candidate);
    }

    // Try every legal formation; keep the best satisfiable one.
    let mut best: Option<(Formation, Vec<&Candidate>, f64)> = None;
    for formation in Formation::LEGAL {
        let mut xi: Vec<&Candidate> = Vec::with_capacity(11);
        let mut satisfiable = true;
        for position in [
            Position::Goalkeeper,
            Position::Defender,
            Position::Midfielder,
            Position::Forward,
        ] {
            let need = formation.required(position);
            let pool = by_position.get(&position).map(Vec::as_slice).unwrap_or(&[]);
            if pool.len() < need {
                satisfiable = false;
                break;
            }
            xi.extend(pool.iter().take(need).copied());
        }
        if !satisfiable {
            continue;
        }
        let total: f64 = xi.iter().map(|c| c.effective).sum();
        if best.as_ref().map(|(_, _, t)| total > *t).unwrap_or(true) {
            best = Some((formation, xi, total));
        }
    }

    let (formation, starters): (Option<Formation>, Vec<Candidate>) = match best {
        Some((formation, xi, _)) => (Some(formation), xi.into_iter().cloned().collect()),
        None => {
            // Squad too depleted for any legal shape: unconstrained top 11.
            debug!(round, "no legal formation satisfiable, using top-11 fallback");
            let mut all = candidates.clone();
            sort_candidates(&mut all);
            (None, all.into_iter().take(11).collect())
        }
    };

    let total_effective_points: f64 = starters.iter().map(|c| c.effective).sum();

    // Captain and vice: the two best starters by effective points.
    let mut leaders: Vec<&Candidate> = starters.iter().collect();
    leaders.sort_by(|a, b| {
        b.effective
            .partial_cmp(&a.effective)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.player.cmp(&b.player))
    });
    let captain = leaders.first().map(|c| c.player);
    let vice_captain = leaders.get(1).map(|c| c.player);

    // Bench: everyone not in the XI, strongest first, capped at four.
    let mut bench_pool: Vec<Candidate> = available
        .iter()
        .filter(|c| !starters.iter().any(|s| s.player == c.player))
        .cloned()
        .chain(
            unavailable
                .iter()
                .filter(|c| !starters.iter().any(|s| s.player == c.player))
                .cloned(),
        )
        .collect();
    sort_candidates(&mut bench_pool);
    let bench: Vec<BenchSlot> = bench_pool
        .into_iter()
        .take(4)
        .enumerate()
        .map(|(i, c)| {
            let status = if !c.has_fixture {
                BenchStatus::Blank
            } else if c.xmin < xm.eligibility_floor {
                BenchStatus::Unlikely
            } else {
                BenchStatus::Available
            };
            BenchSlot {
                player: c.player,
                name: c.name,
                position: c.position,
                effective_points: c.effective,
                status,
                order: (i + 1) as u8,
            }
        })
        .collect();

    // Attention flags.
    let blank_count = candidates.iter().filter(|c| !c.has_fixture).count();
    let thin_count = candidates.iter().filter(|c| c.xmin < xm.thin_minutes).count();
    let mut alerts = Vec::new();
    if blank_count >= 3 {
        alerts.push(format!("{blank_count} squad players have no fixture"));
    }
    if thin_count >= 4 {
        alerts.push(format!(
            "{thin_count} squad players below {} expected minutes",
            xm.thin_minutes
        ));
    }
    let needs_attention = !alerts.is_empty();

    LineupPlan {
        round,
        formation,
        starters: starters
            .into_iter()
            .map(|c| LineupSlot {
                player: c.player,
                name: c.name,
                position: c.position,
                projected_points: c.projected,
                effective_points: c.effective,
                xmin: c.xmin,
            })
            .collect(),
        captain,
        vice_captain,
        bench,
        total_effective_points,
        needs_attention,
        alerts,
    }
}

/// Optimize the lineup for every round of the projection window.
pub fn optimize_lineups(
    squad: &[SquadMember],
    projections: &BTreeMap<PlayerId, PlayerProjection>,
    outlook: &FixtureOutlook,
    cfg: &EngineConfig,
) -> Vec<LineupPlan> {
    outlook
        .projection_window()
        .map(|round| plan_round(squad, projections, outlook, round, cfg))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
