// Report persistence.
//
// Writes the three JSON documents a run produces: the projection table, the
// recommendation set, and the manager's squad view. Pure output; nothing is
// ever read back.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::advice::ranking::rank_by_position;
use crate::app::AdviceBundle;

/// Players listed per position in the projection report.
const TOP_PER_POSITION: usize = 15;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize {name}: {source}")]
    Serialize {
        name: &'static str,
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

fn write_json(
    dir: &Path,
    name: &'static str,
    value: &serde_json::Value,
) -> Result<PathBuf, ReportError> {
    let path = dir.join(name);
    let text = serde_json::to_string_pretty(value)
        .map_err(|source| ReportError::Serialize { name, source })?;
    std::fs::write(&path, text).map_err(|source| ReportError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Write all three reports into `output_dir`, creating it if needed.
/// Returns the written paths.
pub fn write_reports(bundle: &AdviceBundle, output_dir: &Path) -> Result<Vec<PathBuf>, ReportError> {
    std::fs::create_dir_all(output_dir).map_err(|source| ReportError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let generated_at = Utc::now().to_rfc3339();
    let mut written = Vec::with_capacity(3);

    // -- projections.json: top players per position --
    let mut top_by_position = serde_json::Map::new();
    for (position, group) in
        rank_by_position(bundle.projections.values(), |p| p.next_four_points)
    {
        let top: Vec<&_> = group.into_iter().take(TOP_PER_POSITION).collect();
        top_by_position.insert(
            position.short_name().to_string(),
            serde_json::to_value(&top).map_err(|source| ReportError::Serialize {
                name: "projections.json",
                source,
            })?,
        );
    }
    written.push(write_json(
        output_dir,
        "projections.json",
        &json!({
            "generated_at": &generated_at,
            "next_round": bundle.next_round,
            "top_by_position": top_by_position,
        }),
    )?);

    // -- recommendations.json: the four advice products --
    written.push(write_json(
        output_dir,
        "recommendations.json",
        &json!({
            "generated_at": &generated_at,
            "next_round": bundle.next_round,
            "transfers": &bundle.transfers,
            "captaincy": &bundle.captaincy,
            "chips": &bundle.chips,
        }),
    )?);

    // -- my_team.json: squad view plus per-round lineup plans --
    let squad: Vec<serde_json::Value> = bundle
        .squad
        .iter()
        .map(|member| {
            let projection = bundle.projections.get(&member.player);
            json!({
                "player": member.player,
                "name": &member.name,
                "position": member.position,
                "multiplier": member.multiplier,
                "projected_next": projection.map(|p| p.next_round_points).unwrap_or(0.0),
                "projected_next_four": projection.map(|p| p.next_four_points).unwrap_or(0.0),
            })
        })
        .collect();
    written.push(write_json(
        output_dir,
        "my_team.json",
        &json!({
            "generated_at": &generated_at,
            "next_round": bundle.next_round,
            "squad": squad,
            "lineups": &bundle.lineups,
        }),
    )?);

    info!(dir = %output_dir.display(), "reports written");
    Ok(written)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
