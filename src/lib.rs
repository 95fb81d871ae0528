pub mod error;
pub mod logging;
pub mod match_sim;
pub mod measurement;
pub mod pairing;
pub mod season;
pub mod standings;
pub mod types;

pub use error::{Result, SeasonError};
pub use match_sim::MatchSimulator;
pub use season::{create_season, Season};
pub use standings::StandingsComparator;
pub use types::*;

use measurement::{BenchmarkSummary, SweepConfig};
use wasm_bindgen::prelude::*;

fn to_js(e: SeasonError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Initialize panic hook and console logging
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    logging::init_logging(log::LevelFilter::Info);
}

/// Change the console log level ("error", "warn", "info", "debug", "trace", "off")
#[wasm_bindgen]
pub fn set_log_level(level: &str) -> std::result::Result<(), JsValue> {
    let filter = logging::parse_level(level)
        .ok_or_else(|| JsValue::from_str(&format!("Unknown log level: {}", level)))?;
    logging::init_logging(filter);
    Ok(())
}

/// WASM-exposed season wrapper
#[wasm_bindgen]
pub struct SeasonEngine {
    season: Season,
}

#[wasm_bindgen]
impl SeasonEngine {
    /// Create a seeded season with the default config
    #[wasm_bindgen(constructor)]
    pub fn new(
        name: &str,
        competitor_count: usize,
        skill_distribution: &str,
        seed: u64,
    ) -> std::result::Result<SeasonEngine, JsValue> {
        let distribution = skill_distribution.parse().map_err(to_js)?;
        let season = create_season(name, competitor_count, distribution, Some(seed)).map_err(to_js)?;
        Ok(SeasonEngine { season })
    }

    /// Create with custom config; a missing seed draws from system entropy
    pub fn new_with_config(
        name: &str,
        competitor_count: usize,
        skill_distribution: &str,
        seed: Option<u64>,
        config_json: &str,
    ) -> std::result::Result<SeasonEngine, JsValue> {
        let config: SeasonConfig = serde_json::from_str(config_json)
            .map_err(|e| JsValue::from_str(&format!("Config parse error: {}", e)))?;
        let distribution = skill_distribution.parse().map_err(to_js)?;
        let season = Season::new(name, competitor_count, distribution, seed, config).map_err(to_js)?;
        Ok(SeasonEngine { season })
    }

    /// Create from a JSON list of `[name, skill]` entrants, kept in order
    pub fn from_entrants(
        name: &str,
        entrants_json: &str,
        seed: Option<u64>,
    ) -> std::result::Result<SeasonEngine, JsValue> {
        let entrants: Vec<(String, f64)> = serde_json::from_str(entrants_json)
            .map_err(|e| JsValue::from_str(&format!("Entrants parse error: {}", e)))?;
        let season =
            Season::from_entrants(name, entrants, seed, SeasonConfig::default()).map_err(to_js)?;
        Ok(SeasonEngine { season })
    }

    /// Seed match history between two named competitors
    pub fn add_previous_pairing(&mut self, a: &str, b: &str) -> std::result::Result<(), JsValue> {
        self.season.add_previous_pairing_by_name(a, b).map_err(to_js)?;
        Ok(())
    }

    /// Pair the next Swiss round without playing it; JSON list of `[home, away]` names
    pub fn schedule_one_round(&self) -> std::result::Result<String, JsValue> {
        let pairings = self.season.schedule_one_round().map_err(to_js)?;
        Ok(self.named_rounds(&[pairings]))
    }

    /// Run Swiss rounds; returns every round's pairings as JSON
    pub fn run_swiss_rounds(&mut self, count: usize) -> std::result::Result<String, JsValue> {
        let rounds = self.season.run_swiss_rounds(count).map_err(to_js)?;
        Ok(self.named_rounds(&rounds))
    }

    /// Run shuffled (non-seeded) rounds; returns every round's pairings as JSON
    pub fn run_random_rounds(&mut self, count: usize) -> std::result::Result<String, JsValue> {
        let rounds = self.season.run_random_rounds(count).map_err(to_js)?;
        Ok(self.named_rounds(&rounds))
    }

    /// Run a full round robin; returns every round's pairings as JSON
    pub fn run_round_robin_rounds(&mut self) -> std::result::Result<String, JsValue> {
        let rounds = self.season.run_round_robin_rounds().map_err(to_js)?;
        Ok(self.named_rounds(&rounds))
    }

    /// Run Swiss weeks of `matches_per_week` rounds each
    pub fn run_swiss_tuple_rounds(
        &mut self,
        weeks: usize,
        matches_per_week: usize,
    ) -> std::result::Result<String, JsValue> {
        let rounds = self
            .season
            .run_swiss_tuple_rounds(weeks, matches_per_week)
            .map_err(to_js)?;
        Ok(self.named_rounds(&rounds))
    }

    /// Get standings table as JSON
    pub fn get_standings(&self) -> String {
        serde_json::to_string(&self.season.standings_table()).unwrap_or_default()
    }

    /// Get standings as CSV-like text
    pub fn get_standings_text(&self) -> String {
        self.season.to_string()
    }

    /// Get season statistics JSON
    pub fn get_stats(&self) -> String {
        serde_json::to_string(&self.season.stats).unwrap_or_default()
    }

    /// Get full season state as JSON
    pub fn get_state(&self) -> String {
        self.season.state_json()
    }

    /// Get per-position distortions and their mean as JSON
    pub fn get_distortions(&self) -> String {
        let distortions = measurement::distortions(&self.season);
        serde_json::json!({
            "skill_ranks": measurement::skill_ranks(&self.season),
            "distortions": distortions,
            "mean": measurement::mean_distortion(&distortions),
        })
        .to_string()
    }

    /// Get expected match points, prorated to `matches` matches, as JSON
    pub fn get_expected_match_points(&self, matches: usize) -> String {
        let expected: Vec<_> = measurement::normalized_expected_match_points(&self.season, matches)
            .into_iter()
            .filter_map(|(id, points)| {
                self.season.competitor(id).map(|c| {
                    serde_json::json!({
                        "name": c.name,
                        "skill": c.skill,
                        "expected": points,
                        "actual": c.points,
                    })
                })
            })
            .collect();
        serde_json::to_string(&expected).unwrap_or_default()
    }

    /// Get default config as JSON
    pub fn get_default_config() -> String {
        serde_json::to_string(&SeasonConfig::default()).unwrap_or_default()
    }

    /// Get total entries, including the bye
    pub fn get_total_competitors(&self) -> usize {
        self.season.len()
    }
}

impl SeasonEngine {
    fn named_rounds(&self, rounds: &[Vec<Pairing>]) -> String {
        let named: Vec<Vec<[&str; 2]>> = rounds
            .iter()
            .map(|round| {
                round
                    .iter()
                    .map(|p| {
                        let name = |id: CompetitorId| {
                            self.season.competitor(id).map(|c| c.name.as_str()).unwrap_or("?")
                        };
                        [name(p.home), name(p.away)]
                    })
                    .collect()
            })
            .collect();
        serde_json::to_string(&named).unwrap_or_default()
    }
}

/// Run a distortion sweep; `config_json` is a `SweepConfig`
#[wasm_bindgen]
pub fn run_sweep(config_json: &str) -> std::result::Result<String, JsValue> {
    let config: SweepConfig = serde_json::from_str(config_json)
        .map_err(|e| JsValue::from_str(&format!("Config parse error: {}", e)))?;
    let records = measurement::measure_distortions(&config).map_err(to_js)?;
    serde_json::to_string(&records)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Week-by-week (table rank, skill rank) trajectory of one season as JSON
#[wasm_bindgen]
pub fn standings_trajectory(
    competitor_count: usize,
    weeks: usize,
    discipline: &str,
    skill_distribution: &str,
    seed: u64,
) -> std::result::Result<String, JsValue> {
    let discipline: Discipline = discipline.parse().map_err(to_js)?;
    let distribution: SkillDistribution = skill_distribution.parse().map_err(to_js)?;
    let mut season =
        create_season("Main", competitor_count, distribution, Some(seed)).map_err(to_js)?;
    let points = measurement::standings_trajectory(&mut season, discipline, weeks).map_err(to_js)?;
    serde_json::to_string(&points)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Compare the disciplines on identically seeded fields
#[wasm_bindgen]
pub fn compare_disciplines(
    competitor_count: usize,
    matches: usize,
    skill_distribution: &str,
    seed: u64,
) -> std::result::Result<String, JsValue> {
    let distribution: SkillDistribution = skill_distribution.parse().map_err(to_js)?;

    let mut results = Vec::new();
    for discipline in [
        Discipline::Swiss,
        Discipline::Random,
        Discipline::RandomThenSwiss,
        Discipline::RoundRobin,
    ] {
        let mut season =
            create_season("Main", competitor_count, distribution, Some(seed)).map_err(to_js)?;
        season.run(discipline, matches).map_err(to_js)?;
        let distortions = measurement::distortions(&season);

        results.push(serde_json::json!({
            "discipline": discipline,
            "mean_distortion": measurement::mean_distortion(&distortions),
            "stats": season.stats,
            "standings": season.standings_table(),
        }));
    }

    serde_json::to_string(&results)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Time `iterations` Swiss seasons of true-random skill; JSON `BenchmarkSummary` in ms
#[wasm_bindgen]
pub fn benchmark_season(
    iterations: usize,
    competitor_count: usize,
    matches: usize,
    seed: u64,
) -> std::result::Result<String, JsValue> {
    let mut durations = Vec::with_capacity(iterations);
    for i in 0..iterations {
        let start = js_sys::Date::now();
        let mut season = create_season(
            "Main",
            competitor_count,
            SkillDistribution::TrueRandom,
            Some(seed.wrapping_add(i as u64)),
        )
        .map_err(to_js)?;
        season.run_swiss_rounds(matches).map_err(to_js)?;
        durations.push(js_sys::Date::now() - start);
    }

    let summary = BenchmarkSummary::from_durations(&durations)
        .ok_or_else(|| JsValue::from_str("iterations must be at least 1"))?;
    log::info!(
        "min: {:.0} max: {:.0} mean: {:.3} stdev: {:.3} median: {:.3}",
        summary.min,
        summary.max,
        summary.mean,
        summary.stdev,
        summary.median
    );
    serde_json::to_string(&summary)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}
