// Expected minutes (xMin) and rolling form.
//
// xMin separates "high rate, rarely plays" from "reliable starter": it is
// the minutes a player can realistically be expected to play next round,
// built from their per-start average and scaled down for availability,
// club rotation habits, and cold form. Effective points = projected points
// weighted by xMin, consumed by the lineup optimizer and the bench-oriented
// chip scoring only.

use crate::config::{ExpectedMinutesConfig, FormConfig};
use crate::model::{FormTrend, MatchSample, PlayerStatLine};

// ---------------------------------------------------------------------------
// Rolling form
// ---------------------------------------------------------------------------

/// Classify a player's rolling form from their recent match history.
///
/// The last `window_matches` appearances (minutes > 0) are weighted with
/// exponential decay, most recent first, and the weighted points-per-match
/// is compared to the season baseline. Missing or empty history reads as
/// Steady: no evidence either way.
pub fn form_trend(
    history: Option<&[MatchSample]>,
    season_points_per_match: f64,
    cfg: &FormConfig,
) -> FormTrend {
    let Some(history) = history else {
        return FormTrend::Steady;
    };

    let recent: Vec<&MatchSample> = history
        .iter()
        .filter(|m| m.minutes > 0)
        .rev()
        .take(cfg.window_matches)
        .collect();
    if recent.is_empty() || season_points_per_match <= 0.0 {
        return FormTrend::Steady;
    }

    let mut weighted_points = 0.0;
    let mut total_weight = 0.0;
    for (i, sample) in recent.iter().enumerate() {
        let weight = cfg.decay.powi(i as i32);
        weighted_points += sample.total_points as f64 * weight;
        total_weight += weight;
    }
    let recent_ppm = weighted_points / total_weight;

    let ratio = recent_ppm / season_points_per_match;
    if ratio >= cfg.hot_ratio {
        FormTrend::Hot
    } else if ratio <= cfg.cold_ratio {
        FormTrend::Cold
    } else {
        FormTrend::Steady
    }
}

// ---------------------------------------------------------------------------
// Expected minutes
// ---------------------------------------------------------------------------

/// Expected minutes for the next round, clamped to [0, 90].
///
/// base = per-start minutes average (capped at a full match), then scaled by
/// the availability fraction, the rotation-risk tier from the config name
/// lists, and the form multiplier.
pub fn expected_minutes(
    stat: &PlayerStatLine,
    form: FormTrend,
    cfg: &ExpectedMinutesConfig,
) -> f64 {
    let base = (stat.minutes as f64 / stat.starts.max(1) as f64).min(cfg.full_match);

    let availability = stat
        .chance_of_playing
        .map(|c| f64::from(c) / 100.0)
        .unwrap_or_else(|| stat.status.availability_fraction());

    let rotation = if cfg.high_risk.iter().any(|n| n == &stat.name) {
        cfg.high_risk_factor
    } else if cfg.medium_risk.iter().any(|n| n == &stat.name) {
        cfg.medium_risk_factor
    } else {
        1.0
    };

    let form_factor = match form {
        FormTrend::Hot => cfg.hot_form_factor,
        FormTrend::Cold => cfg.cold_form_factor,
        FormTrend::Steady => 1.0,
    };

    (base * availability * rotation * form_factor).clamp(0.0, cfg.full_match)
}

/// Projected points discounted by expected-minutes confidence. Always at
/// most the raw projection since xmin never exceeds a full match.
pub fn effective_points(projected: f64, xmin: f64, cfg: &ExpectedMinutesConfig) -> f64 {
    projected * (xmin / cfg.full_match)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
