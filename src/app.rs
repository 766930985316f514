// Run orchestration: wires the projection pipeline and the four decision
// engines together in dependency order. `analyze` is a pure function of the
// input snapshot and the engine config, so a rerun over identical inputs
// reproduces identical advice.

use std::collections::{BTreeMap, HashMap};

use tracing::info;

use crate::advice::captain::{select_captain, CaptainAdvice};
use crate::advice::chips::{plan_chips, ChipRecommendation};
use crate::advice::lineup::{optimize_lineups, LineupPlan};
use crate::advice::transfers::{recommend_transfers, TransferRecommendation};
use crate::advice::{build_squad, SquadMember};
use crate::config::EngineConfig;
use crate::model::{
    Chip, EnrichedStats, Fixture, MatchSample, PlayerId, PlayerStatLine, Round, SquadPick, Team,
    TeamId, TeamMatchXg,
};
use crate::projection::fixtures::build_fixture_outlook;
use crate::projection::points::{project_players, PlayerProjection};
use crate::projection::strength::build_strength_model;

// ---------------------------------------------------------------------------
// Input snapshot
// ---------------------------------------------------------------------------

/// Everything a full run consumes, already fetched and normalized.
#[derive(Debug, Clone)]
pub struct EngineInputs {
    pub teams: Vec<Team>,
    pub fixtures: Vec<Fixture>,
    pub players: Vec<PlayerStatLine>,
    pub picks: Vec<SquadPick>,
    pub bank: f64,
    pub chips_available: Vec<Chip>,
    /// Optional per-player true-xG records from an external enrichment
    /// source (identity matching happens upstream).
    pub enrichment: HashMap<PlayerId, EnrichedStats>,
    /// Optional per-player recent match history for rolling form.
    pub histories: HashMap<PlayerId, Vec<MatchSample>>,
    /// First round of the lookahead window.
    pub next_round: Round,
}

// ---------------------------------------------------------------------------
// Output bundle
// ---------------------------------------------------------------------------

/// The four advice products plus the shared projection table they were
/// derived from.
#[derive(Debug, Clone)]
pub struct AdviceBundle {
    pub next_round: Round,
    pub projections: BTreeMap<PlayerId, PlayerProjection>,
    pub squad: Vec<SquadMember>,
    pub transfers: Vec<TransferRecommendation>,
    pub captaincy: CaptainAdvice,
    pub chips: Vec<ChipRecommendation>,
    pub lineups: Vec<LineupPlan>,
}

// ---------------------------------------------------------------------------
// Goal-expectation proxy
// ---------------------------------------------------------------------------

/// Build each team's goal-expectation history from finished fixtures' actual
/// scorelines. Stands in for a true xG feed when none is wired up; the
/// strength model is agnostic to the source.
pub fn team_xg_from_results(fixtures: &[Fixture]) -> HashMap<TeamId, Vec<TeamMatchXg>> {
    let mut history: HashMap<TeamId, Vec<TeamMatchXg>> = HashMap::new();
    for fixture in fixtures {
        if !fixture.finished {
            continue;
        }
        let (Some(home_goals), Some(away_goals)) = (fixture.home_goals, fixture.away_goals) else {
            continue;
        };
        history.entry(fixture.home).or_default().push(TeamMatchXg {
            xg_for: f64::from(home_goals),
            xg_against: f64::from(away_goals),
        });
        history.entry(fixture.away).or_default().push(TeamMatchXg {
            xg_for: f64::from(away_goals),
            xg_against: f64::from(home_goals),
        });
    }
    history
}

// ---------------------------------------------------------------------------
// Full pipeline
// ---------------------------------------------------------------------------

/// Run the full projection and advice pipeline over one input snapshot.
///
/// The strength model and fixture outlook are computed once and shared by
/// every decision engine so all four see identical difficulty figures.
pub fn analyze(inputs: &EngineInputs, cfg: &EngineConfig) -> AdviceBundle {
    let team_history = team_xg_from_results(&inputs.fixtures);
    let strengths = build_strength_model(&inputs.teams, &team_history, &cfg.strength);

    let outlook = build_fixture_outlook(
        &inputs.fixtures,
        &strengths,
        inputs.next_round,
        &cfg.horizon,
        &cfg.difficulty,
    );
    info!(
        doubles = outlook.double_rounds.len(),
        blanks = outlook.blank_rounds.len(),
        "fixture outlook ready"
    );

    let projections = project_players(
        &inputs.players,
        &inputs.enrichment,
        &inputs.histories,
        &outlook,
        &strengths,
        cfg,
    );
    info!(players = projections.len(), "projections computed");

    let squad = build_squad(&inputs.picks, &inputs.players);
    if squad.len() < inputs.picks.len() {
        info!(
            dropped = inputs.picks.len() - squad.len(),
            "picks referenced unknown players"
        );
    }

    let transfers = recommend_transfers(&squad, &projections, &outlook, inputs.bank, cfg);
    let captaincy = select_captain(&squad, &projections, cfg);
    let chips = plan_chips(
        &squad,
        &projections,
        &outlook,
        &inputs.chips_available,
        cfg,
    );
    let lineups = optimize_lineups(&squad, &projections, &outlook, cfg);

    info!(
        transfers = transfers.len(),
        chips = chips.len(),
        "advice generated"
    );

    AdviceBundle {
        next_round: inputs.next_round,
        projections,
        squad,
        transfers,
        captaincy,
        chips,
        lineups,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
