// Fantasy provider API client.
//
// Fetches the season bootstrap payload, the fixture list, a manager's picks
// and entry history, and per-player match histories, normalizing the
// provider's stringly-typed JSON into the crate's domain records. Rows that
// fail to normalize are skipped with a warning; the engine runs on whatever
// survives.

use std::collections::HashMap;

use futures_util::{stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::warn;

use crate::model::{
    Chip, Fixture, MatchSample, PlayerId, PlayerStatLine, PlayerStatus, Position, PriceTrend,
    Round, SquadPick, Team,
};

/// Concurrent in-flight requests for per-player detail fetches.
const HISTORY_CONCURRENCY: usize = 8;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("failed to decode response from {url}: {source}")]
    Decode { url: String, source: reqwest::Error },
}

// ---------------------------------------------------------------------------
// Raw provider structs (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawBootstrap {
    events: Vec<RawEvent>,
    teams: Vec<RawTeam>,
    elements: Vec<RawElement>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: u32,
    #[serde(default)]
    is_current: bool,
    #[serde(default)]
    is_next: bool,
}

#[derive(Debug, Deserialize)]
struct RawTeam {
    id: u32,
    name: String,
    short_name: String,
}

/// One player row from the bootstrap payload. Percent-style fields arrive as
/// strings; several fields are absent early in a season.
#[derive(Debug, Deserialize)]
struct RawElement {
    id: u32,
    web_name: String,
    team: u32,
    element_type: u8,
    #[serde(default)]
    minutes: u32,
    #[serde(default)]
    starts: u32,
    #[serde(default)]
    goals_scored: u32,
    #[serde(default)]
    assists: u32,
    #[serde(default)]
    total_points: i32,
    now_cost: u32,
    #[serde(default)]
    selected_by_percent: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    chance_of_playing_next_round: Option<u32>,
    #[serde(default)]
    news: String,
    #[serde(default)]
    cost_change_event: i32,
}

#[derive(Debug, Deserialize)]
struct RawFixture {
    event: Option<u32>,
    team_h: u32,
    team_a: u32,
    #[serde(default)]
    finished: bool,
    #[serde(default)]
    team_h_score: Option<u32>,
    #[serde(default)]
    team_a_score: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawPicksResponse {
    picks: Vec<RawPick>,
    entry_history: RawPicksEntryHistory,
}

#[derive(Debug, Deserialize)]
struct RawPick {
    element: u32,
    multiplier: u32,
    #[serde(default)]
    selling_price: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawPicksEntryHistory {
    #[serde(default)]
    bank: u32,
}

#[derive(Debug, Deserialize)]
struct RawEntryHistory {
    #[serde(default)]
    chips: Vec<RawChipPlay>,
}

#[derive(Debug, Deserialize)]
struct RawChipPlay {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawElementSummary {
    #[serde(default)]
    history: Vec<RawPlayerMatch>,
}

#[derive(Debug, Deserialize)]
struct RawPlayerMatch {
    round: u32,
    #[serde(default)]
    minutes: u32,
    #[serde(default)]
    goals_scored: u32,
    #[serde(default)]
    assists: u32,
    #[serde(default)]
    total_points: i32,
}

// ---------------------------------------------------------------------------
// Normalized aggregates
// ---------------------------------------------------------------------------

/// The season bootstrap, normalized.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    pub teams: Vec<Team>,
    pub players: Vec<PlayerStatLine>,
    pub current_round: Option<Round>,
    pub next_round: Round,
}

/// A manager's squad for a round plus their bank balance.
#[derive(Debug, Clone)]
pub struct ManagerPicks {
    pub picks: Vec<SquadPick>,
    pub bank: f64,
}

// ---------------------------------------------------------------------------
// Normalization (private, pure)
// ---------------------------------------------------------------------------

fn normalize_element(raw: RawElement) -> Option<PlayerStatLine> {
    let Some(position) = Position::from_element_type(raw.element_type) else {
        // Non-playing element types (e.g. assistant managers) are expected.
        return None;
    };
    let ownership = raw.selected_by_percent.trim().parse::<f64>().unwrap_or_else(|_| {
        warn!(player = %raw.web_name, "unparseable ownership, defaulting to 0");
        0.0
    });
    Some(PlayerStatLine {
        id: raw.id,
        name: raw.web_name,
        team: raw.team,
        position,
        minutes: raw.minutes,
        starts: raw.starts,
        goals: raw.goals_scored,
        assists: raw.assists,
        total_points: raw.total_points,
        price: f64::from(raw.now_cost) / 10.0,
        ownership,
        status: PlayerStatus::from_code(&raw.status),
        chance_of_playing: raw.chance_of_playing_next_round,
        news: raw.news,
        price_trend: match raw.cost_change_event.cmp(&0) {
            std::cmp::Ordering::Greater => PriceTrend::Rising,
            std::cmp::Ordering::Equal => PriceTrend::Flat,
            std::cmp::Ordering::Less => PriceTrend::Falling,
        },
    })
}

fn normalize_bootstrap(raw: RawBootstrap) -> Bootstrap {
    let current_round = raw.events.iter().find(|e| e.is_current).map(|e| e.id);
    let next_round = raw
        .events
        .iter()
        .find(|e| e.is_next)
        .map(|e| e.id)
        .or_else(|| current_round.map(|r| r + 1))
        .unwrap_or(1);

    let teams = raw
        .teams
        .into_iter()
        .map(|t| Team {
            id: t.id,
            name: t.name,
            short_name: t.short_name,
        })
        .collect();

    let players = raw
        .elements
        .into_iter()
        .filter_map(normalize_element)
        .collect();

    Bootstrap {
        teams,
        players,
        current_round,
        next_round,
    }
}

fn normalize_fixture(raw: RawFixture) -> Fixture {
    Fixture {
        round: raw.event,
        home: raw.team_h,
        away: raw.team_a,
        finished: raw.finished,
        home_goals: raw.team_h_score,
        away_goals: raw.team_a_score,
    }
}

/// Join raw picks with the player universe; picks for unknown elements are
/// dropped with a warning. The sale price falls back to the current price
/// when the provider omits it.
fn normalize_picks(raw: RawPicksResponse, players: &[PlayerStatLine]) -> ManagerPicks {
    let mut picks = Vec::with_capacity(raw.picks.len());
    for pick in raw.picks {
        let Some(stat) = players.iter().find(|p| p.id == pick.element) else {
            warn!(element = pick.element, "pick references unknown player, skipping");
            continue;
        };
        picks.push(SquadPick {
            player: pick.element,
            team: stat.team,
            multiplier: pick.multiplier,
            selling_price: pick
                .selling_price
                .map(|p| f64::from(p) / 10.0)
                .unwrap_or(stat.price),
        });
    }
    ManagerPicks {
        picks,
        bank: f64::from(raw.entry_history.bank) / 10.0,
    }
}

fn chips_available(raw: RawEntryHistory) -> Vec<Chip> {
    let played: Vec<Chip> = raw
        .chips
        .iter()
        .filter_map(|c| Chip::from_provider_name(&c.name))
        .collect();
    Chip::ALL
        .into_iter()
        .filter(|chip| !played.contains(chip))
        .collect()
}

fn normalize_history(raw: RawElementSummary) -> Vec<MatchSample> {
    raw.history
        .into_iter()
        .map(|m| MatchSample {
            round: m.round,
            minutes: m.minutes,
            goals: m.goals_scored,
            assists: m.assists,
            total_points: m.total_points,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Thin async client over the provider's public endpoints.
pub struct FplClient {
    http: reqwest::Client,
    base_url: String,
}

impl FplClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        FplClient {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|source| ApiError::Request {
                url: url.clone(),
                source,
            })?;
        response
            .json::<T>()
            .await
            .map_err(|source| ApiError::Decode { url, source })
    }

    /// Season-wide static data: teams, players, round markers.
    pub async fn fetch_bootstrap(&self) -> Result<Bootstrap, ApiError> {
        let raw: RawBootstrap = self.get_json("/bootstrap-static/").await?;
        Ok(normalize_bootstrap(raw))
    }

    /// The full season fixture list.
    pub async fn fetch_fixtures(&self) -> Result<Vec<Fixture>, ApiError> {
        let raw: Vec<RawFixture> = self.get_json("/fixtures/").await?;
        Ok(raw.into_iter().map(normalize_fixture).collect())
    }

    /// A manager's picks for the given round, joined with the player
    /// universe.
    pub async fn fetch_picks(
        &self,
        entry_id: u64,
        round: Round,
        players: &[PlayerStatLine],
    ) -> Result<ManagerPicks, ApiError> {
        let raw: RawPicksResponse = self
            .get_json(&format!("/entry/{entry_id}/event/{round}/picks/"))
            .await?;
        Ok(normalize_picks(raw, players))
    }

    /// Which chips the manager has not yet played.
    pub async fn fetch_chips_available(&self, entry_id: u64) -> Result<Vec<Chip>, ApiError> {
        let raw: RawEntryHistory = self.get_json(&format!("/entry/{entry_id}/history/")).await?;
        Ok(chips_available(raw))
    }

    /// One player's per-match season history.
    pub async fn fetch_player_history(
        &self,
        player: PlayerId,
    ) -> Result<Vec<MatchSample>, ApiError> {
        let raw: RawElementSummary = self
            .get_json(&format!("/element-summary/{player}/"))
            .await?;
        Ok(normalize_history(raw))
    }

    /// Fetch match histories for a set of players with bounded concurrency.
    /// A failed fetch degrades that player to no history rather than failing
    /// the batch.
    pub async fn fetch_histories(
        &self,
        players: &[PlayerId],
    ) -> HashMap<PlayerId, Vec<MatchSample>> {
        let results: Vec<(PlayerId, Result<Vec<MatchSample>, ApiError>)> =
            stream::iter(players.iter().copied())
                .map(|id| async move { (id, self.fetch_player_history(id).await) })
                .buffer_unordered(HISTORY_CONCURRENCY)
                .collect()
                .await;

        let mut histories = HashMap::new();
        for (id, result) in results {
            match result {
                Ok(history) => {
                    histories.insert(id, history);
                }
                Err(e) => warn!(player = id, error = %e, "history fetch failed, skipping"),
            }
        }
        histories
    }
}

// ---------------------------------------------------------------------------
// Tests (normalization only; no network)
// ---------------------------------------------------------------------------
