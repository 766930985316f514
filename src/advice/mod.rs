// Decision engines: transfer recommender, captain selector, chip strategy
// optimizer, and starting-lineup optimizer. All four are read-only consumers
// of the shared projection data computed once per run.

pub mod captain;
pub mod chips;
pub mod lineup;
pub mod ranking;
pub mod transfers;

use serde::Serialize;

use crate::model::{PlayerId, PlayerStatLine, Position, SquadPick, TeamId};

// ---------------------------------------------------------------------------
// Squad view
// ---------------------------------------------------------------------------

/// A manager's pick joined with the identity fields the engines need. Built
/// once by the orchestrator; a pick whose player is unknown to the stat
/// universe is dropped (stale pick data), which the caller logs.
#[derive(Debug, Clone, Serialize)]
pub struct SquadMember {
    pub player: PlayerId,
    pub name: String,
    pub team: TeamId,
    pub position: Position,
    /// 0 = bench, 1 = starter, 2 = captain, 3 = triple captain.
    pub multiplier: u32,
    pub selling_price: f64,
}

impl SquadMember {
    pub fn is_starter(&self) -> bool {
        self.multiplier > 0
    }
}

/// Join picks with the player universe.
pub fn build_squad(picks: &[SquadPick], stats: &[PlayerStatLine]) -> Vec<SquadMember> {
    picks
        .iter()
        .filter_map(|pick| {
            stats.iter().find(|s| s.id == pick.player).map(|stat| SquadMember {
                player: pick.player,
                name: stat.name.clone(),
                team: stat.team,
                position: stat.position,
                multiplier: pick.multiplier,
                selling_price: pick.selling_price,
            })
        })
        .collect()
}
