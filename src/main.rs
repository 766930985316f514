// FPL Brain entry point.
//
// Pipeline:
// 1. Initialize tracing
// 2. Load config
// 3. Fetch season data, fixtures, and the manager's squad
// 4. Run the projection and advice pipeline
// 5. Write the JSON reports and log a summary

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use tracing::{info, warn};

use fpl_brain::api::FplClient;
use fpl_brain::app::{self, EngineInputs};
use fpl_brain::config;
use fpl_brain::model::Chip;
use fpl_brain::report;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    info!("FPL Brain starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        entry = config.manager.entry_id,
        api = %config.manager.api_base_url,
        "config loaded"
    );

    let client = FplClient::new(config.manager.api_base_url.clone());

    let bootstrap = client
        .fetch_bootstrap()
        .await
        .context("failed to fetch bootstrap data")?;
    info!(
        players = bootstrap.players.len(),
        teams = bootstrap.teams.len(),
        next_round = bootstrap.next_round,
        "bootstrap fetched"
    );

    let fixtures = client
        .fetch_fixtures()
        .await
        .context("failed to fetch fixtures")?;
    info!(fixtures = fixtures.len(), "fixtures fetched");

    // The manager's squad only exists once the season is underway.
    let (picks, bank, chips_available) = match bootstrap.current_round {
        Some(current) => {
            let picks = client
                .fetch_picks(config.manager.entry_id, current, &bootstrap.players)
                .await
                .context("failed to fetch squad picks")?;
            let chips = client
                .fetch_chips_available(config.manager.entry_id)
                .await
                .context("failed to fetch entry history")?;
            (picks.picks, picks.bank, chips)
        }
        None => {
            warn!("season not started: running projections without squad advice");
            (Vec::new(), 0.0, Chip::ALL.to_vec())
        }
    };
    info!(picks = picks.len(), bank, "squad loaded");

    // Rolling form needs per-player histories; fetch them for the squad only
    // and let everyone else default to steady form.
    let squad_ids: Vec<_> = picks.iter().map(|p| p.player).collect();
    let histories = client.fetch_histories(&squad_ids).await;
    info!(histories = histories.len(), "player histories fetched");

    let inputs = EngineInputs {
        next_round: bootstrap.next_round,
        teams: bootstrap.teams,
        players: bootstrap.players,
        fixtures,
        picks,
        bank,
        chips_available,
        // Hook for a true-xG enrichment feed; identity matching and
        // retrieval live outside this binary.
        enrichment: HashMap::new(),
        histories,
    };

    let bundle = app::analyze(&inputs, &config.engine);

    let written = report::write_reports(&bundle, Path::new(&config.manager.output_dir))
        .context("failed to write reports")?;
    for path in &written {
        info!(path = %path.display(), "report written");
    }

    if let Some(safe) = &bundle.captaincy.safe_pick {
        info!(
            "captain pick: {} ({:.1} pts projected)",
            safe.name, safe.projected_points
        );
    }
    if let Some(transfer) = bundle.transfers.first() {
        info!(
            "top transfer: {} -> {} (+{:.1} pts over four rounds)",
            transfer.out_name, transfer.in_name, transfer.gain_next_four
        );
    }
    for chip in &bundle.chips {
        info!(
            "chip suggestion: {} in round {}",
            chip.chip.label(),
            chip.round
        );
    }

    info!("done");
    Ok(())
}

/// Log to stderr with an env-filter override (`RUST_LOG`).
fn init_tracing() {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fpl_brain=info,fplbrain=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
