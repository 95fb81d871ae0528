//! Rank-distortion measurement over simulated seasons
//!
//! A season's distortion is how far each competitor's final standings
//! position sits from its position by latent skill. The bye sentinel is left
//! out of every measurement here.

use crate::error::{Result, SeasonError};
use crate::pairing::round_robin;
use crate::season::Season;
use crate::types::*;
use serde::{Deserialize, Serialize};

/// Real competitors in standings order
fn ranked_field(season: &Season) -> Vec<&Competitor> {
    season.standings().into_iter().filter(|c| !c.is_bye).collect()
}

/// For each standings position, the competitor's 0-based rank by skill
/// (highest skill = 0)
pub fn skill_ranks(season: &Season) -> Vec<usize> {
    let field = ranked_field(season);
    let mut by_skill: Vec<CompetitorId> = field.iter().map(|c| c.id).collect();
    by_skill.sort_by(|a, b| {
        let (sa, sb) = (season.competitors()[a.index()].skill, season.competitors()[b.index()].skill);
        sb.total_cmp(&sa)
    });

    field
        .iter()
        .map(|c| by_skill.iter().position(|&id| id == c.id).unwrap_or(0))
        .collect()
}

/// |standings position - skill rank| per standings position
pub fn distortions(season: &Season) -> Vec<usize> {
    skill_ranks(season)
        .into_iter()
        .enumerate()
        .map(|(position, rank)| position.abs_diff(rank))
        .collect()
}

/// Mean taxicab distortion per competitor
pub fn mean_distortion(distortions: &[usize]) -> f64 {
    if distortions.is_empty() {
        return 0.0;
    }
    distortions.iter().sum::<usize>() as f64 / distortions.len() as f64
}

/// Mean distortion over the top `k` standings positions, if the field is that large
pub fn top_k_mean_distortion(distortions: &[usize], k: usize) -> Option<f64> {
    if k == 0 || distortions.len() < k {
        return None;
    }
    Some(mean_distortion(&distortions[..k]))
}

/// Expected match points of every real competitor over a round robin
/// played without randomness
pub fn expected_match_points(season: &Season) -> Vec<(CompetitorId, f64)> {
    let simulator = crate::match_sim::MatchSimulator::from_config(&season.config);
    let field: Vec<&Competitor> = season.competitors().iter().filter(|c| !c.is_bye).collect();

    field
        .iter()
        .map(|c| {
            let total = field
                .iter()
                .filter(|other| other.id != c.id)
                .map(|other| simulator.expected_match_points(c.skill, other.skill).0)
                .sum();
            (c.id, total)
        })
        .collect()
}

/// Expected match points prorated from a round robin to `matches` matches
pub fn normalized_expected_match_points(season: &Season, matches: usize) -> Vec<(CompetitorId, f64)> {
    let opponents = season.competitors().iter().filter(|c| !c.is_bye).count().saturating_sub(1);
    if opponents == 0 {
        return Vec::new();
    }
    expected_match_points(season)
        .into_iter()
        .map(|(id, total)| (id, total / opponents as f64 * matches as f64))
        .collect()
}

/// Longest Swiss season run by default for `competitors` teams
pub fn default_max_matches(competitors: usize) -> usize {
    (competitors.div_ceil(2) * 2).saturating_sub(3).max(1)
}

/// Parameter sweep over field sizes and season lengths
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub discipline: Discipline,
    pub distribution: SkillDistribution,
    pub competitors_start: usize,
    pub competitors_stop: usize,
    pub matches_start: usize,
    /// Upper bound on matches; `None` uses [`default_max_matches`]
    pub matches_stop: Option<usize>,
    /// Seasons simulated per (competitors, matches) cell
    pub iterations: usize,
    pub seed: u64,
    pub season: SeasonConfig,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            discipline: Discipline::Swiss,
            distribution: SkillDistribution::Uniform,
            competitors_start: 8,
            competitors_stop: 16,
            matches_start: 1,
            matches_stop: None,
            iterations: 20,
            seed: 0,
            season: SeasonConfig::default(),
        }
    }
}

impl SweepConfig {
    pub fn validate(&self) -> Result<()> {
        if self.competitors_start < 2 || self.competitors_stop < self.competitors_start {
            return Err(SeasonError::InvalidConfiguration(format!(
                "bad competitor range {}..={}",
                self.competitors_start, self.competitors_stop
            )));
        }
        if self.iterations == 0 {
            return Err(SeasonError::InvalidConfiguration(
                "iterations must be at least 1".to_string(),
            ));
        }
        if self.matches_start == 0 && self.discipline != Discipline::RoundRobin {
            return Err(SeasonError::InvalidConfiguration(
                "matches_start must be at least 1".to_string(),
            ));
        }
        self.season.validate()
    }
}

/// Averaged distortion for one (competitors, matches) cell
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DistortionRecord {
    pub competitors: usize,
    pub matches: usize,
    /// Seasons that completed
    pub seasons: usize,
    /// Seasons abandoned because a round could not be paired
    pub infeasible: usize,
    pub mean_distortion: f64,
    pub top4_distortion: Option<f64>,
    pub top8_distortion: Option<f64>,
    pub upset_rate: f64,
}

/// Run the sweep. Each season gets its own seed derived from `config.seed`.
pub fn measure_distortions(config: &SweepConfig) -> Result<Vec<DistortionRecord>> {
    config.validate()?;

    let mut records = Vec::new();
    let mut next_seed = config.seed;

    for competitors in config.competitors_start..=config.competitors_stop {
        let match_counts: Vec<usize> = match config.discipline {
            Discipline::RoundRobin => vec![competitors + competitors % 2 - 1],
            _ => {
                let stop = config
                    .matches_stop
                    .unwrap_or_else(|| default_max_matches(competitors));
                (config.matches_start..=stop).collect()
            }
        };

        for matches in match_counts {
            let mut record = DistortionRecord {
                competitors,
                matches,
                seasons: 0,
                infeasible: 0,
                mean_distortion: 0.0,
                top4_distortion: None,
                top8_distortion: None,
                upset_rate: 0.0,
            };
            let mut top4 = Vec::new();
            let mut top8 = Vec::new();

            for _ in 0..config.iterations {
                let mut season = Season::new(
                    "Main",
                    competitors,
                    config.distribution,
                    Some(next_seed),
                    config.season.clone(),
                )?;
                next_seed = next_seed.wrapping_add(1);

                match season.run(config.discipline, matches) {
                    Ok(_) => {}
                    Err(SeasonError::SchedulingInfeasible { round, .. }) => {
                        log::warn!(
                            "{} competitors / {} matches: no pairing in round {}",
                            competitors,
                            matches,
                            round
                        );
                        record.infeasible += 1;
                        continue;
                    }
                    Err(e) => return Err(e),
                }

                let d = distortions(&season);
                record.seasons += 1;
                record.mean_distortion += mean_distortion(&d);
                record.upset_rate += season.stats.upset_rate();
                top4.extend(top_k_mean_distortion(&d, 4));
                top8.extend(top_k_mean_distortion(&d, 8));
            }

            if record.seasons > 0 {
                record.mean_distortion /= record.seasons as f64;
                record.upset_rate /= record.seasons as f64;
            }
            record.top4_distortion = average(&top4);
            record.top8_distortion = average(&top8);

            log::debug!(
                "{} competitors / {} matches: mean distortion {:.5}",
                competitors,
                matches,
                record.mean_distortion
            );
            records.push(record);
        }
    }

    Ok(records)
}

/// One table position after one week of a season
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrajectoryPoint {
    pub week: usize,
    /// 1-based standings position
    pub table_rank: usize,
    /// 1-based skill rank of the competitor holding that position
    pub skill_rank: usize,
}

/// Play `season` one round at a time under `discipline`, recording where every
/// skill rank sits in the table after each week. Round robin ignores `weeks`
/// and plays its fixed schedule.
pub fn standings_trajectory(
    season: &mut Season,
    discipline: Discipline,
    weeks: usize,
) -> Result<Vec<TrajectoryPoint>> {
    let fixture = match discipline {
        Discipline::RoundRobin => Some(round_robin(season.standings_order())?),
        _ => None,
    };
    let weeks = fixture.as_ref().map_or(weeks, |rounds| rounds.len());
    let random_weeks = season.config.random_rounds_of(weeks);

    let mut points = Vec::with_capacity(weeks * season.len());
    for week in 1..=weeks {
        match (&fixture, discipline) {
            (Some(rounds), _) => {
                let format = season.config.format_for_round(season.stats.rounds_played + 1);
                season.play_round(&rounds[week - 1], format)?;
            }
            (None, Discipline::Random) => {
                season.run_random_rounds(1)?;
            }
            (None, Discipline::RandomThenSwiss) if week <= random_weeks => {
                season.run_random_rounds(1)?;
            }
            (None, _) => {
                season.run_swiss_rounds(1)?;
            }
        }

        points.extend(skill_ranks(season).into_iter().enumerate().map(|(position, rank)| {
            TrajectoryPoint {
                week,
                table_rank: position + 1,
                skill_rank: rank + 1,
            }
        }));
    }
    Ok(points)
}

fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Timing summary over repeated season runs (milliseconds)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BenchmarkSummary {
    pub runs: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub stdev: f64,
    pub median: f64,
}

impl BenchmarkSummary {
    pub fn from_durations(durations: &[f64]) -> Option<Self> {
        if durations.is_empty() {
            return None;
        }

        let mut sorted = durations.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;
        let variance = sorted.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n as f64;
        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };

        Some(Self {
            runs: n,
            min: sorted[0],
            max: sorted[n - 1],
            mean,
            stdev: variance.sqrt(),
            median,
        })
    }
}
