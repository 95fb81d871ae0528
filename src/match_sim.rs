//! Stochastic match outcomes and match point allocation

use crate::error::{Result, SeasonError};
use crate::types::*;
use rand::Rng;

/// Computes match outcomes from latent skills. Holds no competitor state;
/// callers apply the returned records themselves.
#[derive(Clone, Copy, Debug)]
pub struct MatchSimulator {
    odds_scaling_factor: f64,
}

impl MatchSimulator {
    pub fn new(odds_scaling_factor: f64) -> Self {
        Self { odds_scaling_factor }
    }

    pub fn from_config(config: &SeasonConfig) -> Self {
        Self::new(config.odds_scaling_factor)
    }

    /// Probability that the home side takes any single round
    pub fn home_win_probability(&self, home_skill: f64, away_skill: f64) -> f64 {
        let diff = home_skill - away_skill;
        let logistic = 1.0 / (1.0 + (-self.odds_scaling_factor * diff).exp());
        if logistic.is_finite() {
            logistic.clamp(0.0, 1.0)
        } else {
            0.5
        }
    }

    /// Play a match between two competitors. Bye matches never touch the rng.
    pub fn play<R: Rng + ?Sized>(
        &self,
        home: &Competitor,
        away: &Competitor,
        format: MatchFormat,
        rng: &mut R,
    ) -> Result<(MatchRecord, MatchRecord)> {
        match (home.is_bye, away.is_bye) {
            (true, true) => Err(SeasonError::InvariantViolation(
                "home and away cannot both be the bye".to_string(),
            )),
            (true, false) => Ok((MatchRecord::bye_loss(), MatchRecord::bye_win())),
            (false, true) => Ok((MatchRecord::bye_win(), MatchRecord::bye_loss())),
            (false, false) => Ok(self.simulate(home.skill, away.skill, format, rng)),
        }
    }

    /// Run independent rounds until one side reaches the format's win limit
    pub fn simulate<R: Rng + ?Sized>(
        &self,
        home_skill: f64,
        away_skill: f64,
        format: MatchFormat,
        rng: &mut R,
    ) -> (MatchRecord, MatchRecord) {
        let p = self.home_win_probability(home_skill, away_skill);
        let win_limit = format.win_limit();

        let mut home_rounds = 0;
        let mut away_rounds = 0;
        while home_rounds < win_limit && away_rounds < win_limit {
            if rng.gen_bool(p) {
                home_rounds += 1;
            } else {
                away_rounds += 1;
            }
        }

        records_from_rounds(home_rounds, away_rounds, format)
    }

    /// Deterministic expectation for a pairing: the favourite takes the
    /// win limit and the underdog the round count whose ratio best matches
    /// the favourite's round-win probability, averaged over both formats.
    pub fn expected_match_points(&self, home_skill: f64, away_skill: f64) -> (f64, f64) {
        let p = self.home_win_probability(home_skill, away_skill);
        if p == 0.5 {
            let half = MATCH_POINTS_TOTAL as f64 / 2.0;
            return (half, half);
        }

        let formats = [MatchFormat::Stopwatch, MatchFormat::Koth];
        let mut home_total = 0.0;
        let mut away_total = 0.0;
        for format in formats {
            let limit = format.win_limit();
            let (home_rounds, away_rounds) = if p > 0.5 {
                (limit, closest_loser_rounds(p, limit))
            } else {
                (closest_loser_rounds(1.0 - p, limit), limit)
            };
            let (home_points, away_points) = match_points(home_rounds, away_rounds);
            home_total += home_points as f64;
            away_total += away_points as f64;
        }

        let n = formats.len() as f64;
        (home_total / n, away_total / n)
    }
}

impl Default for MatchSimulator {
    fn default() -> Self {
        Self::from_config(&SeasonConfig::default())
    }
}

/// Loser round count `r` in `0..limit` whose ratio limit/(limit+r) is
/// closest to `p`
fn closest_loser_rounds(p: f64, limit: u32) -> u32 {
    let mut best = 0;
    let mut best_gap = f64::MAX;
    for loser_rounds in 0..limit {
        let ratio = limit as f64 / (limit + loser_rounds) as f64;
        let gap = (p - ratio).abs();
        if gap < best_gap {
            best_gap = gap;
            best = loser_rounds;
        }
    }
    best
}

/// Build both sides' records from a finished round count. Stopwatch round
/// counts are doubled after the points are settled; points never change.
pub fn records_from_rounds(
    home_rounds: u32,
    away_rounds: u32,
    format: MatchFormat,
) -> (MatchRecord, MatchRecord) {
    let home_won = home_rounds > away_rounds;
    let (home_points, away_points) = match_points(home_rounds, away_rounds);
    let (home_fraction, away_fraction) = fractional_points(home_rounds, away_rounds);

    let scale = match format {
        MatchFormat::Koth => 1,
        MatchFormat::Stopwatch => 2,
    };
    let (home_rounds, away_rounds) = (home_rounds * scale, away_rounds * scale);

    let home = MatchRecord {
        won: home_won,
        rounds_won: home_rounds,
        rounds_lost: away_rounds,
        points: home_points,
        fractional_points: home_fraction,
    };
    let away = MatchRecord {
        won: !home_won,
        rounds_won: away_rounds,
        rounds_lost: home_rounds,
        points: away_points,
        fractional_points: away_fraction,
    };
    (home, away)
}

/// Integer match points for (home, away). A side reaching 4 rounds takes
/// 6 + (3 - loser rounds) and the loser keeps its rounds; anything else is
/// split 9 proportionally to rounds won.
pub fn match_points(home_rounds: u32, away_rounds: u32) -> (u32, u32) {
    let total = home_rounds + away_rounds;
    if total == 0 {
        return (0, 0);
    }

    if home_rounds.max(away_rounds) == KOTH_WIN_LIMIT {
        let loser_rounds = home_rounds.min(away_rounds);
        let winner_points = 6 + (3 - loser_rounds.min(3));
        let loser_points = MATCH_POINTS_TOTAL - winner_points;
        if home_rounds > away_rounds {
            (winner_points, loser_points)
        } else {
            (loser_points, winner_points)
        }
    } else {
        let home_points =
            (MATCH_POINTS_TOTAL as f64 * home_rounds as f64 / total as f64).round() as u32;
        (home_points, MATCH_POINTS_TOTAL - home_points)
    }
}

/// 9 * rounds_won / rounds_played for each side, unrounded
pub fn fractional_points(home_rounds: u32, away_rounds: u32) -> (f64, f64) {
    let total = (home_rounds + away_rounds) as f64;
    if total == 0.0 {
        return (0.0, 0.0);
    }
    let scale = MATCH_POINTS_TOTAL as f64 / total;
    (home_rounds as f64 * scale, away_rounds as f64 * scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_koth_point_table() {
        assert_eq!(match_points(4, 0), (9, 0));
        assert_eq!(match_points(4, 1), (8, 1));
        assert_eq!(match_points(4, 2), (7, 2));
        assert_eq!(match_points(4, 3), (6, 3));
        // Mirrored for away wins
        assert_eq!(match_points(1, 4), (1, 8));
        assert_eq!(match_points(3, 4), (3, 6));
    }

    #[test]
    fn test_stopwatch_points_and_doubling() {
        let (home, away) = records_from_rounds(2, 0, MatchFormat::Stopwatch);
        assert_eq!(home.points, 9);
        assert_eq!(away.points, 0);
        assert_eq!(home.rounds_won, 4);
        assert_eq!(home.rounds_lost, 0);
        assert_eq!(away.rounds_won, 0);
        assert_eq!(away.rounds_lost, 4);
        assert!(home.won);
        assert!(!away.won);

        let (home, away) = records_from_rounds(1, 2, MatchFormat::Stopwatch);
        assert_eq!((home.points, away.points), (3, 6));
        assert_eq!((home.rounds_won, away.rounds_won), (2, 4));
        assert!(away.won);
    }

    #[test]
    fn test_fractional_points() {
        let (home, away) = records_from_rounds(4, 2, MatchFormat::Koth);
        assert!((home.fractional_points - 6.0).abs() < 1e-9);
        assert!((away.fractional_points - 3.0).abs() < 1e-9);

        // Unaffected by stopwatch doubling
        let (home, away) = records_from_rounds(2, 1, MatchFormat::Stopwatch);
        assert!((home.fractional_points - 6.0).abs() < 1e-9);
        assert!((away.fractional_points - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_points_always_sum_to_nine() {
        let sim = MatchSimulator::default();
        let mut rng = StdRng::seed_from_u64(7);
        for i in 0..500 {
            let format = if i % 2 == 0 { MatchFormat::Koth } else { MatchFormat::Stopwatch };
            let home_skill = rng.gen_range(-3.0..3.0);
            let away_skill = rng.gen_range(-3.0..3.0);
            let (home, away) = sim.simulate(home_skill, away_skill, format, &mut rng);
            assert_eq!(home.points + away.points, MATCH_POINTS_TOTAL);
            assert_ne!(home.won, away.won);
            assert_eq!(home.rounds_won, away.rounds_lost);
            // Stopwatch winners take 2 rounds, recorded doubled
            assert_eq!(home.rounds_won.max(away.rounds_won), 4);
        }
    }

    #[test]
    fn test_equal_skill_is_coin_flip() {
        let sim = MatchSimulator::default();
        assert_eq!(sim.home_win_probability(0.0, 0.0), 0.5);
        assert_eq!(sim.home_win_probability(1.7, 1.7), 0.5);
        assert!(sim.home_win_probability(1.0, 0.0) > 0.5);
        assert!(sim.home_win_probability(-1.0, 0.0) < 0.5);
    }

    #[test]
    fn test_extreme_skill_gap_is_finite() {
        let sim = MatchSimulator::default();
        let p = sim.home_win_probability(1e6, -1e6);
        assert!(p.is_finite());
        assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let sim = MatchSimulator::default();
        let mut rng_a = StdRng::seed_from_u64(99);
        let mut rng_b = StdRng::seed_from_u64(99);
        for _ in 0..50 {
            let a = sim.simulate(0.3, -0.2, MatchFormat::Koth, &mut rng_a);
            let b = sim.simulate(0.3, -0.2, MatchFormat::Koth, &mut rng_b);
            assert_eq!(a, b);
        }
    }

    /// Rng that panics if touched
    struct Untouchable;

    impl rand::RngCore for Untouchable {
        fn next_u32(&mut self) -> u32 {
            panic!("bye matches must not draw randomness")
        }
        fn next_u64(&mut self) -> u64 {
            panic!("bye matches must not draw randomness")
        }
        fn fill_bytes(&mut self, _dest: &mut [u8]) {
            panic!("bye matches must not draw randomness")
        }
        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
            panic!("bye matches must not draw randomness")
        }
    }

    #[test]
    fn test_bye_skips_simulation() {
        let sim = MatchSimulator::default();
        let team = Competitor::new(CompetitorId(0), "Team A", -2.0);
        let bye = Competitor::bye(CompetitorId(1));

        let (home, away) = sim.play(&team, &bye, MatchFormat::Stopwatch, &mut Untouchable).unwrap();
        assert_eq!(home, MatchRecord::bye_win());
        assert_eq!(away, MatchRecord::bye_loss());
        assert_eq!((home.rounds_won, home.rounds_lost, home.points), (4, 0, 9));

        let (home, away) = sim.play(&bye, &team, MatchFormat::Koth, &mut Untouchable).unwrap();
        assert_eq!(home.points, 0);
        assert_eq!(away.points, 9);
        assert!(away.won);
    }

    #[test]
    fn test_double_bye_rejected() {
        let sim = MatchSimulator::default();
        let bye_a = Competitor::bye(CompetitorId(0));
        let bye_b = Competitor::bye(CompetitorId(1));
        let result = sim.play(&bye_a, &bye_b, MatchFormat::Koth, &mut Untouchable);
        assert!(matches!(result, Err(SeasonError::InvariantViolation(_))));
    }

    #[test]
    fn test_expected_match_points() {
        let sim = MatchSimulator::default();
        assert_eq!(sim.expected_match_points(0.0, 0.0), (4.5, 4.5));

        // p = 1 / (1 + e^-6) ~ 0.9975: clean sweeps in both formats
        let (home, away) = sim.expected_match_points(3.0, 0.0);
        assert!((home - 9.0).abs() < 1e-9);
        assert!(away.abs() < 1e-9);

        // Mirrored
        let (home, away) = sim.expected_match_points(0.0, 3.0);
        assert!(home.abs() < 1e-9);
        assert!((away - 9.0).abs() < 1e-9);

        // p = 1 / (1 + e^-0.4) ~ 0.599: stopwatch 2-1 (6-3), koth 4-3 (6-3)
        let (home, away) = sim.expected_match_points(0.2, 0.0);
        assert!((home - 6.0).abs() < 1e-9);
        assert!((away - 3.0).abs() < 1e-9);
    }
}
