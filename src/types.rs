use crate::error::{Result, SeasonError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Round wins needed to take a KOTH match
pub const KOTH_WIN_LIMIT: u32 = 4;
/// Round wins needed to take a stopwatch match
pub const STOPWATCH_WIN_LIMIT: u32 = 2;
/// Match points shared between the two sides of every match
pub const MATCH_POINTS_TOTAL: u32 = 9;

/// Latent skill of the bye sentinel; far below anything a distribution produces
pub const BYE_SKILL: f64 = -999_999.0;
pub const BYE_NAME: &str = "Bye Week";

/// Stable index of a competitor in its season's arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompetitorId(pub usize);

impl CompetitorId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for CompetitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Match format. KOTH is first to 4 rounds, stopwatch first to 2.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchFormat {
    Koth,
    Stopwatch,
}

impl MatchFormat {
    pub fn win_limit(&self) -> u32 {
        match self {
            MatchFormat::Koth => KOTH_WIN_LIMIT,
            MatchFormat::Stopwatch => STOPWATCH_WIN_LIMIT,
        }
    }

    /// Format for a counter that alternates every round; odd counters play
    /// `odd` and even ones play the other format.
    pub fn alternating(counter: usize, odd: MatchFormat) -> MatchFormat {
        if counter % 2 != 0 {
            odd
        } else {
            odd.other()
        }
    }

    pub fn other(&self) -> MatchFormat {
        match self {
            MatchFormat::Koth => MatchFormat::Stopwatch,
            MatchFormat::Stopwatch => MatchFormat::Koth,
        }
    }
}

/// How initial latent skills are assigned at season creation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillDistribution {
    /// Every competitor at 0
    Identical,
    /// Evenly spaced across `[-skill_spread, skill_spread]`
    Uniform,
    /// Standard normal draw
    Normal,
    /// Continuous uniform draw from `[-skill_spread, skill_spread)`
    TrueRandom,
}

impl FromStr for SkillDistribution {
    type Err = SeasonError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "identical" => Ok(SkillDistribution::Identical),
            "uniform" => Ok(SkillDistribution::Uniform),
            "normal" | "random_normal" => Ok(SkillDistribution::Normal),
            "true_random" => Ok(SkillDistribution::TrueRandom),
            other => Err(SeasonError::InvalidConfiguration(format!(
                "unknown skill distribution: {}",
                other
            ))),
        }
    }
}

/// Scheduling discipline used to drive a season
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discipline {
    Swiss,
    RoundRobin,
    Random,
    /// Random rounds first, Swiss for the rest of the season
    RandomThenSwiss,
}

impl FromStr for Discipline {
    type Err = SeasonError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "swiss" => Ok(Discipline::Swiss),
            "round_robin" | "rr" => Ok(Discipline::RoundRobin),
            "random" => Ok(Discipline::Random),
            "random_then_swiss" | "randswiss" => Ok(Discipline::RandomThenSwiss),
            other => Err(SeasonError::InvalidConfiguration(format!(
                "unknown discipline: {}",
                other
            ))),
        }
    }
}

/// One side's result of a single match
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub won: bool,
    pub rounds_won: u32,
    pub rounds_lost: u32,
    pub points: u32,
    /// 9 * rounds_won / rounds_played, kept apart from the integer points
    pub fractional_points: f64,
}

impl MatchRecord {
    /// Result handed to the real side of a bye match
    pub fn bye_win() -> Self {
        Self {
            won: true,
            rounds_won: KOTH_WIN_LIMIT,
            rounds_lost: 0,
            points: MATCH_POINTS_TOTAL,
            fractional_points: MATCH_POINTS_TOTAL as f64,
        }
    }

    /// Result recorded against the bye sentinel itself
    pub fn bye_loss() -> Self {
        Self {
            won: false,
            rounds_won: 0,
            rounds_lost: KOTH_WIN_LIMIT,
            points: 0,
            fractional_points: 0.0,
        }
    }
}

/// Ordered (home, away) pairing for one round
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pairing {
    pub home: CompetitorId,
    pub away: CompetitorId,
}

impl Pairing {
    pub fn new(home: CompetitorId, away: CompetitorId) -> Self {
        Self { home, away }
    }

    pub fn involves(&self, id: CompetitorId) -> bool {
        self.home == id || self.away == id
    }
}

/// A team in the season, with its running standings totals
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Competitor {
    pub id: CompetitorId,
    pub name: String,
    /// Hidden true strength; only the match simulator and measurement read it
    pub skill: f64,
    pub is_bye: bool,

    pub points: u32,
    pub fractional_points: f64,
    pub wins: u32,
    pub losses: u32,
    pub rounds_won: u32,
    pub rounds_lost: u32,

    /// Opponents already met (or seeded as met)
    pub faced: HashSet<CompetitorId>,
}

impl Competitor {
    pub fn new(id: CompetitorId, name: impl Into<String>, skill: f64) -> Self {
        Self {
            id,
            name: name.into(),
            skill,
            is_bye: false,
            points: 0,
            fractional_points: 0.0,
            wins: 0,
            losses: 0,
            rounds_won: 0,
            rounds_lost: 0,
            faced: HashSet::new(),
        }
    }

    pub fn bye(id: CompetitorId) -> Self {
        let mut bye = Self::new(id, BYE_NAME, BYE_SKILL);
        bye.is_bye = true;
        bye
    }

    /// Fold one match result into the running totals
    pub fn apply(&mut self, record: &MatchRecord) {
        if record.won {
            self.wins += 1;
        } else {
            self.losses += 1;
        }
        self.rounds_won += record.rounds_won;
        self.rounds_lost += record.rounds_lost;
        self.points += record.points;
        self.fractional_points += record.fractional_points;
    }

    pub fn has_faced(&self, other: CompetitorId) -> bool {
        self.faced.contains(&other)
    }

    pub fn matches_played(&self) -> u32 {
        self.wins + self.losses
    }
}

/// Tunable season parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonConfig {
    /// Logistic coefficient `k` in p = 1 / (1 + e^(-k * skill_diff))
    pub odds_scaling_factor: f64,
    /// Half-width of the skill range for uniform and true-random distributions
    pub skill_spread: f64,
    /// Whether round 1 is KOTH; by default seasons open with stopwatch
    pub koth_first_round: bool,
    /// Share of a random-then-Swiss season played as random rounds
    pub random_share: f64,
}

impl Default for SeasonConfig {
    fn default() -> Self {
        Self {
            odds_scaling_factor: 2.0,
            skill_spread: 3.0,
            koth_first_round: false,
            random_share: 0.5,
        }
    }
}

impl SeasonConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.odds_scaling_factor.is_finite() || self.odds_scaling_factor < 0.0 {
            return Err(SeasonError::InvalidConfiguration(format!(
                "odds_scaling_factor must be finite and non-negative, got {}",
                self.odds_scaling_factor
            )));
        }
        if !self.skill_spread.is_finite() || self.skill_spread < 0.0 {
            return Err(SeasonError::InvalidConfiguration(format!(
                "skill_spread must be finite and non-negative, got {}",
                self.skill_spread
            )));
        }
        if !(0.0..=1.0).contains(&self.random_share) {
            return Err(SeasonError::InvalidConfiguration(format!(
                "random_share must lie in [0, 1], got {}",
                self.random_share
            )));
        }
        Ok(())
    }

    /// Random rounds opening a random-then-Swiss season of `matches` rounds
    pub fn random_rounds_of(&self, matches: usize) -> usize {
        ((matches as f64 * self.random_share).ceil() as usize).min(matches)
    }

    /// Format of the given 1-based season round
    pub fn format_for_round(&self, round_no: usize) -> MatchFormat {
        let odd = if self.koth_first_round {
            MatchFormat::Koth
        } else {
            MatchFormat::Stopwatch
        };
        MatchFormat::alternating(round_no, odd)
    }
}

/// Running counters for one season
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SeasonStats {
    pub rounds_played: usize,
    pub matches_played: usize,
    pub byes_awarded: usize,
    pub koth_matches: usize,
    pub stopwatch_matches: usize,
    /// Matches won by the side with the lower latent skill
    pub upsets: usize,
    /// Pairings undone by the Swiss search
    pub backtracks: usize,
    /// Home and away nodes entered by the Swiss search
    pub nodes_visited: usize,
}

impl SeasonStats {
    pub fn upset_rate(&self) -> f64 {
        let contested = self.matches_played.saturating_sub(self.byes_awarded);
        if contested == 0 {
            0.0
        } else {
            self.upsets as f64 / contested as f64
        }
    }
}

/// Read-only standings line, as exported to consumers
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StandingsRow {
    pub rank: usize,
    pub id: CompetitorId,
    pub name: String,
    pub skill: f64,
    pub wins: u32,
    pub losses: u32,
    pub rounds_won: u32,
    pub rounds_lost: u32,
    pub points: u32,
    pub fractional_points: f64,
    pub median_buchholz: i64,
    pub is_bye: bool,
    pub faced: Vec<String>,
}
