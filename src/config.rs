// Configuration loading and parsing (manager.toml, engine.toml).
//
// Every engine weight and threshold lives in `EngineConfig` so the whole
// pipeline is a pure function of (inputs, config). The TOML files only need
// to name the fields they override; everything else falls back to the
// defaults below, which are also what tests build on.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub manager: ManagerConfig,
    pub engine: EngineConfig,
}

// ---------------------------------------------------------------------------
// manager.toml structs
// ---------------------------------------------------------------------------

/// Wrapper for the top-level tables in manager.toml.
#[derive(Debug, Clone, Deserialize)]
struct ManagerFile {
    manager: ManagerSection,
    #[serde(default)]
    api: ApiSection,
    #[serde(default)]
    output: OutputSection,
}

#[derive(Debug, Clone, Deserialize)]
struct ManagerSection {
    entry_id: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiSection {
    base_url: String,
}

impl Default for ApiSection {
    fn default() -> Self {
        ApiSection {
            base_url: "https://fantasy.premierleague.com/api".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct OutputSection {
    dir: String,
}

impl Default for OutputSection {
    fn default() -> Self {
        OutputSection { dir: "data".into() }
    }
}

/// The public manager config assembled from manager.toml.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub entry_id: u64,
    pub api_base_url: String,
    pub output_dir: String,
}

// ---------------------------------------------------------------------------
// engine.toml structs
// ---------------------------------------------------------------------------

/// All projection and advice weights. Defaults mirror the values the engine
/// was tuned with; engine.toml overrides individual fields.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub horizon: HorizonConfig,
    pub strength: StrengthConfig,
    pub difficulty: DifficultyConfig,
    pub scoring: ScoringConfig,
    pub form: FormConfig,
    pub expected_minutes: ExpectedMinutesConfig,
    pub transfers: TransfersConfig,
    pub captain: CaptainConfig,
    pub chips: ChipsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HorizonConfig {
    /// Rounds projected per player.
    pub projection_rounds: u32,
    /// Rounds scanned for double/blank detection.
    pub detection_rounds: u32,
    /// Rounds the transfer planner optimizes over.
    pub planning_rounds: u32,
}

impl Default for HorizonConfig {
    fn default() -> Self {
        HorizonConfig {
            projection_rounds: 6,
            detection_rounds: 10,
            planning_rounds: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StrengthConfig {
    /// League-average expected goals per match, the normalization anchor.
    pub league_avg_xg: f64,
    pub cs_base: f64,
    pub cs_slope: f64,
    pub cs_min: f64,
    pub cs_max: f64,
}

impl Default for StrengthConfig {
    fn default() -> Self {
        StrengthConfig {
            league_avg_xg: 1.3,
            cs_base: 0.6,
            cs_slope: 0.25,
            cs_min: 0.05,
            cs_max: 0.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DifficultyConfig {
    pub min: f64,
    pub max: f64,
    pub home_factor: f64,
    pub away_factor: f64,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        DifficultyConfig {
            min: 0.6,
            max: 1.5,
            home_factor: 0.9,
            away_factor: 1.1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub assist_points: f64,
    pub appearance_full: f64,
    pub appearance_reduced: f64,
    /// Minutes-probability above which full appearance points are assumed.
    pub appearance_threshold: f64,
    pub bonus_threshold: f64,
    pub bonus_scale: f64,
    pub bonus_cap: f64,
    /// Weight of clean-sheet probability in the bonus basis for GK/DEF.
    pub bonus_cs_weight: f64,
    /// Average minutes are divided by this to estimate minutes probability.
    pub minutes_divisor: f64,
    /// Minimum season minutes before any rate estimate is attempted.
    pub min_sample_minutes: u32,
    pub default_availability: f64,
    /// Chance-of-playing below this forces a zero projection.
    pub availability_cutoff: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            assist_points: 3.0,
            appearance_full: 2.0,
            appearance_reduced: 1.0,
            appearance_threshold: 0.6,
            bonus_threshold: 0.3,
            bonus_scale: 2.0,
            bonus_cap: 3.0,
            bonus_cs_weight: 0.5,
            minutes_divisor: 70.0,
            min_sample_minutes: 90,
            default_availability: 0.95,
            availability_cutoff: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    /// Per-match decay applied to older appearances.
    pub decay: f64,
    pub window_matches: usize,
    /// Recent points-per-match at or above this ratio of the season baseline
    /// classifies as hot.
    pub hot_ratio: f64,
    pub cold_ratio: f64,
}

impl Default for FormConfig {
    fn default() -> Self {
        FormConfig {
            decay: 0.85,
            window_matches: 5,
            hot_ratio: 1.25,
            cold_ratio: 0.6,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExpectedMinutesConfig {
    pub full_match: f64,
    pub high_risk_factor: f64,
    pub medium_risk_factor: f64,
    pub hot_form_factor: f64,
    pub cold_form_factor: f64,
    /// Expected minutes below this make a player ineligible for the XI.
    pub eligibility_floor: f64,
    /// Expected minutes below this count toward the thin-squad alert.
    pub thin_minutes: f64,
    /// Players regularly rotated by their club, by display name.
    pub high_risk: Vec<String>,
    pub medium_risk: Vec<String>,
}

impl Default for ExpectedMinutesConfig {
    fn default() -> Self {
        ExpectedMinutesConfig {
            full_match: 90.0,
            high_risk_factor: 0.65,
            medium_risk_factor: 0.80,
            hot_form_factor: 1.05,
            cold_form_factor: 0.90,
            eligibility_floor: 10.0,
            thin_minutes: 60.0,
            high_risk: Vec::new(),
            medium_risk: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransfersConfig {
    /// 4-round projection below this triggers the low-return sell signal.
    pub min_projection: f64,
    pub weight_low_projection: f64,
    pub weight_cold_form: f64,
    pub weight_availability: f64,
    pub weight_blank: f64,
    pub weight_difficulty: f64,
    /// Chance-of-playing percent below this triggers the availability signal.
    pub availability_floor: f64,
    /// Average difficulty above this triggers the hard-run signal.
    pub difficulty_ceiling: f64,
    pub min_sell_score: f64,
    pub max_moves: usize,
    pub min_buyer_starts: u32,
    pub min_buyer_minutes: u32,
    pub min_buyer_projection: f64,
    pub min_gain: f64,
    pub points_per_hit: f64,
    pub hit_horizon_rounds: f64,
    pub team_cap: usize,
    pub ownership_penalty_start: f64,
    pub ownership_penalty_rate: f64,
    pub hot_form_bonus: f64,
    pub double_bonus: f64,
    pub easy_fixture_ceiling: f64,
    pub easy_fixture_bonus: f64,
}

impl Default for TransfersConfig {
    fn default() -> Self {
        TransfersConfig {
            min_projection: 12.0,
            weight_low_projection: 2.0,
            weight_cold_form: 1.5,
            weight_availability: 2.0,
            weight_blank: 1.5,
            weight_difficulty: 1.0,
            availability_floor: 75.0,
            difficulty_ceiling: 1.15,
            min_sell_score: 2.0,
            max_moves: 3,
            min_buyer_starts: 5,
            min_buyer_minutes: 450,
            min_buyer_projection: 15.0,
            min_gain: 2.0,
            points_per_hit: 4.0,
            hit_horizon_rounds: 3.0,
            team_cap: 3,
            ownership_penalty_start: 30.0,
            ownership_penalty_rate: 0.02,
            hot_form_bonus: 1.0,
            double_bonus: 1.5,
            easy_fixture_ceiling: 0.9,
            easy_fixture_bonus: 1.0,
        }
    }
}

/// One ownership band for captaincy-share estimation. Bands are matched top
/// down: the first band whose `min` the ownership reaches supplies the
/// multiplier.
#[derive(Debug, Clone, Deserialize)]
pub struct OwnershipBand {
    pub min: f64,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptainConfig {
    /// Next-round projection a squad player must clear to be considered.
    pub min_projection: f64,
    /// Price floor defining the league-wide template pool.
    pub premium_price: f64,
    pub template_pool_size: usize,
    pub differential_max_ownership: f64,
    pub safe_downside: f64,
    pub upside_threshold: f64,
    pub risky_downside: f64,
    pub shortlist_size: usize,
    pub bands: Vec<OwnershipBand>,
}

impl Default for CaptainConfig {
    fn default() -> Self {
        CaptainConfig {
            min_projection: 2.0,
            premium_price: 8.0,
            template_pool_size: 3,
            differential_max_ownership: 20.0,
            safe_downside: 0.5,
            upside_threshold: 1.5,
            risky_downside: 1.5,
            shortlist_size: 5,
            bands: vec![
                OwnershipBand {
                    min: 50.0,
                    multiplier: 1.8,
                },
                OwnershipBand {
                    min: 30.0,
                    multiplier: 1.4,
                },
                OwnershipBand {
                    min: 15.0,
                    multiplier: 1.0,
                },
                OwnershipBand {
                    min: 0.0,
                    multiplier: 0.5,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChipsConfig {
    pub bench_boost_threshold: f64,
    pub bench_boost_double_bonus: f64,
    pub triple_captain_threshold: f64,
    pub triple_captain_price_floor: f64,
    pub triple_captain_home_bonus: f64,
    pub triple_captain_double_factor: f64,
    pub free_hit_threshold: f64,
    pub free_hit_missing_weight: f64,
    pub free_hit_difficulty_weight: f64,
    /// Missing-player count at which a Free Hit call is high confidence.
    pub free_hit_high_confidence_missing: usize,
    pub wildcard_threshold: f64,
    pub wildcard_cold_players: usize,
    pub wildcard_cold_weight: f64,
    /// Squad players with a double below this counts as poor coverage.
    pub wildcard_double_coverage: usize,
    pub wildcard_coverage_weight: f64,
    pub wildcard_availability_players: usize,
    pub wildcard_availability_weight: f64,
    pub wildcard_price_fall_players: usize,
    pub wildcard_price_fall_weight: f64,
    pub wildcard_difficulty_ceiling: f64,
    pub wildcard_difficulty_weight: f64,
}

impl Default for ChipsConfig {
    fn default() -> Self {
        ChipsConfig {
            bench_boost_threshold: 6.0,
            bench_boost_double_bonus: 0.5,
            triple_captain_threshold: 18.0,
            triple_captain_price_floor: 9.0,
            triple_captain_home_bonus: 1.1,
            triple_captain_double_factor: 1.25,
            free_hit_threshold: 8.0,
            free_hit_missing_weight: 2.0,
            free_hit_difficulty_weight: 4.0,
            free_hit_high_confidence_missing: 6,
            wildcard_threshold: 4.0,
            wildcard_cold_players: 3,
            wildcard_cold_weight: 2.0,
            wildcard_double_coverage: 5,
            wildcard_coverage_weight: 1.5,
            wildcard_availability_players: 3,
            wildcard_availability_weight: 2.0,
            wildcard_price_fall_players: 4,
            wildcard_price_fall_weight: 1.0,
            wildcard_difficulty_ceiling: 1.1,
            wildcard_difficulty_weight: 1.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/manager.toml` and
/// `config/engine.toml`, relative to the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy
/// defaults. Prefer `load_config()` which handles default initialization
/// automatically.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- manager.toml (required) ---
    let manager_path = config_dir.join("manager.toml");
    let manager_text = read_file(&manager_path)?;
    let manager_file: ManagerFile =
        toml::from_str(&manager_text).map_err(|e| ConfigError::ParseError {
            path: manager_path.clone(),
            source: e,
        })?;

    let manager = ManagerConfig {
        entry_id: manager_file.manager.entry_id,
        api_base_url: manager_file.api.base_url,
        output_dir: manager_file.output.dir,
    };

    // --- engine.toml (optional; defaults apply when absent) ---
    let engine_path = config_dir.join("engine.toml");
    let engine = if engine_path.exists() {
        let engine_text = read_file(&engine_path)?;
        toml::from_str(&engine_text).map_err(|e| ConfigError::ParseError {
            path: engine_path.clone(),
            source: e,
        })?
    } else {
        EngineConfig::default()
    };

    let config = Config { manager, engine };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // File already exists in config/, skip it
            }
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working
/// directory, copying default config files first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.manager.entry_id == 0 {
        return Err(ConfigError::ValidationError {
            field: "manager.entry_id".into(),
            message: "must be a real entry id (> 0)".into(),
        });
    }

    let e = &config.engine;

    if e.horizon.projection_rounds == 0 {
        return Err(ConfigError::ValidationError {
            field: "horizon.projection_rounds".into(),
            message: "must be greater than 0".into(),
        });
    }
    if e.horizon.detection_rounds < e.horizon.projection_rounds {
        return Err(ConfigError::ValidationError {
            field: "horizon.detection_rounds".into(),
            message: "must be at least horizon.projection_rounds".into(),
        });
    }
    if e.horizon.planning_rounds == 0 || e.horizon.planning_rounds > e.horizon.projection_rounds {
        return Err(ConfigError::ValidationError {
            field: "horizon.planning_rounds".into(),
            message: "must be between 1 and horizon.projection_rounds".into(),
        });
    }

    if e.strength.league_avg_xg <= 0.0 {
        return Err(ConfigError::ValidationError {
            field: "strength.league_avg_xg".into(),
            message: format!("must be > 0, got {}", e.strength.league_avg_xg),
        });
    }

    if e.difficulty.min <= 0.0 || e.difficulty.min >= e.difficulty.max {
        return Err(ConfigError::ValidationError {
            field: "difficulty.min".into(),
            message: format!(
                "must satisfy 0 < min < max, got min={} max={}",
                e.difficulty.min, e.difficulty.max
            ),
        });
    }

    if !(0.0..=1.0).contains(&e.form.decay) || e.form.decay == 0.0 {
        return Err(ConfigError::ValidationError {
            field: "form.decay".into(),
            message: format!("must be in (0.0, 1.0], got {}", e.form.decay),
        });
    }

    if e.captain.bands.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "captain.bands".into(),
            message: "at least one ownership band is required".into(),
        });
    }
    for window in e.captain.bands.windows(2) {
        if window[1].min >= window[0].min {
            return Err(ConfigError::ValidationError {
                field: "captain.bands".into(),
                message: "band minimums must be strictly descending".into(),
            });
        }
    }
    if e.captain.bands.last().map(|b| b.min) != Some(0.0) {
        return Err(ConfigError::ValidationError {
            field: "captain.bands".into(),
            message: "the last band must have min = 0.0 to cover all players".into(),
        });
    }

    if e.transfers.max_moves == 0 {
        return Err(ConfigError::ValidationError {
            field: "transfers.max_moves".into(),
            message: "must be > 0".into(),
        });
    }
    if e.transfers.team_cap == 0 {
        return Err(ConfigError::ValidationError {
            field: "transfers.team_cap".into(),
            message: "must be > 0".into(),
        });
    }
    if e.transfers.hit_horizon_rounds <= 0.0 {
        return Err(ConfigError::ValidationError {
            field: "transfers.hit_horizon_rounds".into(),
            message: format!("must be > 0, got {}", e.transfers.hit_horizon_rounds),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
