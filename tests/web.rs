//! Browser-side checks of the wasm surface. Run with `wasm-pack test --headless --firefox`.
#![cfg(target_arch = "wasm32")]

use rgl_season_sim::SeasonEngine;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn engine_runs_swiss_season() {
    let mut engine = SeasonEngine::new("Main", 9, "uniform", 42).unwrap();
    assert_eq!(engine.get_total_competitors(), 10);

    let rounds: Vec<Vec<[String; 2]>> =
        serde_json::from_str(&engine.run_swiss_rounds(3).unwrap()).unwrap();
    assert_eq!(rounds.len(), 3);
    assert!(rounds.iter().all(|r| r.len() == 5));

    let standings: serde_json::Value = serde_json::from_str(&engine.get_standings()).unwrap();
    assert_eq!(standings.as_array().unwrap().len(), 10);
    assert_eq!(standings[9]["is_bye"], true);
}

#[wasm_bindgen_test]
fn engine_rejects_unknown_distribution() {
    assert!(SeasonEngine::new("Main", 8, "bimodal", 1).is_err());
}

#[wasm_bindgen_test]
fn entropy_seeded_engine() {
    let mut engine = SeasonEngine::new_with_config("Main", 8, "true_random", None, "{}").unwrap();
    assert!(engine.run_round_robin_rounds().is_ok());
}

#[wasm_bindgen_test]
fn trajectory_covers_every_week() {
    let json = rgl_season_sim::standings_trajectory(8, 3, "random_then_swiss", "uniform", 5).unwrap();
    let points: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(points.as_array().unwrap().len(), 3 * 8);
}
