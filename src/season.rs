use crate::error::{Result, SeasonError};
use crate::match_sim::MatchSimulator;
use crate::pairing::{round_robin, SwissSearch};
use crate::standings::StandingsComparator;
use crate::types::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One simulated season: the competitor arena, the current standings order
/// over it, and the season's own random source.
///
/// The standings order is re-sorted after every round, so scheduling always
/// sees the field in standings order. Odd fields carry exactly one bye,
/// appended at creation.
pub struct Season {
    pub name: String,
    /// Arena; `CompetitorId(i)` is `competitors[i]` for the life of the season
    competitors: Vec<Competitor>,
    /// Current standings, best first
    standings: Vec<CompetitorId>,
    pub config: SeasonConfig,
    pub stats: SeasonStats,
    simulator: MatchSimulator,
    rng: StdRng,
    /// Seed used, if the season is reproducible
    rng_seed: Option<u64>,
}

/// Serializable view of a season for consumers
#[derive(Serialize, Deserialize)]
pub struct SeasonSnapshot {
    pub name: String,
    pub seed: Option<u64>,
    pub standings: Vec<StandingsRow>,
    pub stats: SeasonStats,
}

impl Season {
    /// Generate `competitor_count` teams with skills drawn from `distribution`
    pub fn new(
        name: &str,
        competitor_count: usize,
        distribution: SkillDistribution,
        seed: Option<u64>,
        config: SeasonConfig,
    ) -> Result<Self> {
        if competitor_count < 2 {
            return Err(SeasonError::InvalidConfiguration(format!(
                "a season needs at least 2 competitors, got {}",
                competitor_count
            )));
        }
        config.validate()?;

        let mut season = Self::empty(name, seed, config);
        for i in 0..competitor_count {
            let skill = season.generate_skill(distribution, i, competitor_count);
            season.push_competitor(format!("Team {}", i), skill);
        }

        season.standings.shuffle(&mut season.rng);
        season.push_bye_if_odd();

        log::info!(
            "Created season {} with {} competitors ({:?} skills)",
            season.name,
            competitor_count,
            distribution
        );
        Ok(season)
    }

    /// Build a season from explicit (name, skill) entrants, kept in the given
    /// order. Used to replay real historical fields.
    pub fn from_entrants(
        name: &str,
        entrants: Vec<(String, f64)>,
        seed: Option<u64>,
        config: SeasonConfig,
    ) -> Result<Self> {
        if entrants.len() < 2 {
            return Err(SeasonError::InvalidConfiguration(format!(
                "a season needs at least 2 competitors, got {}",
                entrants.len()
            )));
        }
        config.validate()?;

        let mut season = Self::empty(name, seed, config);
        for (entrant_name, skill) in entrants {
            if !skill.is_finite() {
                return Err(SeasonError::InvalidConfiguration(format!(
                    "skill for {} must be finite",
                    entrant_name
                )));
            }
            season.push_competitor(entrant_name, skill);
        }
        season.push_bye_if_odd();
        Ok(season)
    }

    fn empty(name: &str, seed: Option<u64>, config: SeasonConfig) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            name: name.to_string(),
            competitors: Vec::new(),
            standings: Vec::new(),
            simulator: MatchSimulator::from_config(&config),
            config,
            stats: SeasonStats::default(),
            rng,
            rng_seed: seed,
        }
    }

    fn push_competitor(&mut self, name: String, skill: f64) {
        let id = CompetitorId(self.competitors.len());
        self.competitors.push(Competitor::new(id, name, skill));
        self.standings.push(id);
    }

    fn push_bye_if_odd(&mut self) {
        if self.competitors.len() % 2 == 1 {
            let id = CompetitorId(self.competitors.len());
            self.competitors.push(Competitor::bye(id));
            self.standings.push(id);
        }
    }

    fn generate_skill(&mut self, distribution: SkillDistribution, index: usize, count: usize) -> f64 {
        let spread = self.config.skill_spread;
        match distribution {
            SkillDistribution::Identical => 0.0,
            SkillDistribution::Uniform => index as f64 / (count - 1) as f64 * 2.0 * spread - spread,
            SkillDistribution::Normal => self.rng.sample(StandardNormal),
            SkillDistribution::TrueRandom => {
                if spread > 0.0 {
                    self.rng.gen_range(-spread..spread)
                } else {
                    0.0
                }
            }
        }
    }

    pub fn seed(&self) -> Option<u64> {
        self.rng_seed
    }

    /// Number of entries including the bye
    pub fn len(&self) -> usize {
        self.competitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.competitors.is_empty()
    }

    pub fn has_bye(&self) -> bool {
        self.competitors.iter().any(|c| c.is_bye)
    }

    /// Whole arena, indexed by `CompetitorId`
    pub fn competitors(&self) -> &[Competitor] {
        &self.competitors
    }

    pub fn competitor(&self, id: CompetitorId) -> Option<&Competitor> {
        self.competitors.get(id.index())
    }

    pub fn find(&self, name: &str) -> Option<CompetitorId> {
        self.competitors.iter().find(|c| c.name == name).map(|c| c.id)
    }

    /// Current standings order
    pub fn standings_order(&self) -> &[CompetitorId] {
        &self.standings
    }

    /// Read-only snapshot of the field in standings order
    pub fn standings(&self) -> Vec<&Competitor> {
        self.standings.iter().map(|id| &self.competitors[id.index()]).collect()
    }

    pub fn standings_table(&self) -> Vec<StandingsRow> {
        let cmp = StandingsComparator::new(&self.competitors);
        self.standings
            .iter()
            .enumerate()
            .map(|(i, &id)| {
                let c = &self.competitors[id.index()];
                let mut faced: Vec<CompetitorId> = c.faced.iter().copied().collect();
                faced.sort();
                StandingsRow {
                    rank: i + 1,
                    id,
                    name: c.name.clone(),
                    skill: c.skill,
                    wins: c.wins,
                    losses: c.losses,
                    rounds_won: c.rounds_won,
                    rounds_lost: c.rounds_lost,
                    points: c.points,
                    fractional_points: c.fractional_points,
                    median_buchholz: cmp.buchholz(id),
                    is_bye: c.is_bye,
                    faced: faced
                        .into_iter()
                        .map(|f| self.competitors[f.index()].name.clone())
                        .collect(),
                }
            })
            .collect()
    }

    pub fn snapshot(&self) -> SeasonSnapshot {
        SeasonSnapshot {
            name: self.name.clone(),
            seed: self.rng_seed,
            standings: self.standings_table(),
            stats: self.stats.clone(),
        }
    }

    /// Get current season state as JSON
    pub fn state_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_default()
    }

    /// Record that `a` and `b` have already met, without playing a match
    pub fn add_previous_pairing(&mut self, a: CompetitorId, b: CompetitorId) -> Result<&mut Self> {
        if a == b {
            return Err(SeasonError::InvalidConfiguration(format!(
                "competitor {} cannot be paired with itself",
                a
            )));
        }
        for id in [a, b] {
            match self.competitors.get(id.index()) {
                None => {
                    return Err(SeasonError::InvalidConfiguration(format!(
                        "unknown competitor {}",
                        id
                    )))
                }
                Some(c) if c.is_bye => {
                    return Err(SeasonError::InvalidConfiguration(
                        "previous pairings cannot involve the bye".to_string(),
                    ))
                }
                Some(_) => {}
            }
        }

        self.mark_faced(a, b);
        Ok(self)
    }

    /// Name-based variant of [`Season::add_previous_pairing`]
    pub fn add_previous_pairing_by_name(&mut self, a: &str, b: &str) -> Result<&mut Self> {
        let lookup = |name: &str| {
            self.find(name).ok_or_else(|| {
                SeasonError::InvalidConfiguration(format!("unknown competitor: {}", name))
            })
        };
        let (a, b) = (lookup(a)?, lookup(b)?);
        self.add_previous_pairing(a, b)
    }

    fn mark_faced(&mut self, a: CompetitorId, b: CompetitorId) {
        self.competitors[a.index()].faced.insert(b);
        self.competitors[b.index()].faced.insert(a);
    }

    fn unmark_faced(&mut self, a: CompetitorId, b: CompetitorId) {
        self.competitors[a.index()].faced.remove(&b);
        self.competitors[b.index()].faced.remove(&a);
    }

    /// Re-sort the standings order. Ties keep their previous relative order.
    pub fn sort_standings(&mut self) {
        let cmp = StandingsComparator::new(&self.competitors);
        cmp.sort(&mut self.standings);
    }

    /// Shuffle the standings order, keeping a trailing bye in place
    pub fn shuffle(&mut self) {
        let bye_last = self
            .standings
            .last()
            .map(|id| self.competitors[id.index()].is_bye)
            .unwrap_or(false);
        let end = if bye_last { self.standings.len() - 1 } else { self.standings.len() };
        self.standings[..end].shuffle(&mut self.rng);
    }

    /// Pair the current standings for one Swiss round without playing it
    pub fn schedule_one_round(&self) -> Result<Vec<Pairing>> {
        SwissSearch::new(&self.standings, &self.competitors)
            .for_round(self.stats.rounds_played + 1)
            .run()
            .map(|outcome| outcome.pairings)
    }

    fn schedule_swiss_round(&mut self, round_no: usize) -> Result<Vec<Pairing>> {
        let outcome = SwissSearch::new(&self.standings, &self.competitors)
            .for_round(round_no)
            .run()?;
        self.stats.backtracks += outcome.backtracks;
        self.stats.nodes_visited += outcome.nodes_visited;
        Ok(outcome.pairings)
    }

    /// Play every pairing of one round, then re-sort. All matches are
    /// simulated before any competitor is touched.
    pub fn play_round(&mut self, pairings: &[Pairing], format: MatchFormat) -> Result<()> {
        let mut results = Vec::with_capacity(pairings.len());
        for p in pairings {
            let home = self.competitors.get(p.home.index()).ok_or_else(|| {
                SeasonError::InvariantViolation(format!("unknown competitor {}", p.home))
            })?;
            let away = self.competitors.get(p.away.index()).ok_or_else(|| {
                SeasonError::InvariantViolation(format!("unknown competitor {}", p.away))
            })?;
            let records = self.simulator.play(home, away, format, &mut self.rng)?;
            results.push((*p, records));
        }

        for (p, (home_record, away_record)) in results {
            self.apply_match(p, &home_record, &away_record, format);
        }

        self.stats.rounds_played += 1;
        self.sort_standings();
        log::debug!("Standings after round {}:\n{}", self.stats.rounds_played, self);
        Ok(())
    }

    fn apply_match(
        &mut self,
        p: Pairing,
        home_record: &MatchRecord,
        away_record: &MatchRecord,
        format: MatchFormat,
    ) {
        self.competitors[p.home.index()].apply(home_record);
        self.competitors[p.away.index()].apply(away_record);
        self.mark_faced(p.home, p.away);

        let (home, away) = (&self.competitors[p.home.index()], &self.competitors[p.away.index()]);
        self.stats.matches_played += 1;
        if home.is_bye || away.is_bye {
            self.stats.byes_awarded += 1;
        } else {
            match format {
                MatchFormat::Koth => self.stats.koth_matches += 1,
                MatchFormat::Stopwatch => self.stats.stopwatch_matches += 1,
            }
            let winner_skill = if home_record.won { home.skill } else { away.skill };
            let loser_skill = if home_record.won { away.skill } else { home.skill };
            if winner_skill < loser_skill {
                self.stats.upsets += 1;
            }
        }
    }

    /// Play `count` Swiss rounds, returning each round's pairings
    pub fn run_swiss_rounds(&mut self, count: usize) -> Result<Vec<Vec<Pairing>>> {
        let mut rounds = Vec::with_capacity(count);
        for _ in 0..count {
            let round_no = self.stats.rounds_played + 1;
            log::info!("{}: scheduling Swiss round {}", self.name, round_no);

            let pairings = self.schedule_swiss_round(round_no)?;
            log::debug!("Schedule: {}", self.describe(&pairings));

            self.play_round(&pairings, self.config.format_for_round(round_no))?;
            rounds.push(pairings);
        }
        Ok(rounds)
    }

    /// Play `count` rounds paired from a shuffled field instead of the
    /// standings. The shuffle keeps the bye last; the same search still
    /// rules out rematches.
    pub fn run_random_rounds(&mut self, count: usize) -> Result<Vec<Vec<Pairing>>> {
        let mut rounds = Vec::with_capacity(count);
        for _ in 0..count {
            let round_no = self.stats.rounds_played + 1;
            log::info!("{}: scheduling random round {}", self.name, round_no);

            let previous = self.standings.clone();
            self.shuffle();
            let pairings = match self.schedule_swiss_round(round_no) {
                Ok(pairings) => pairings,
                Err(e) => {
                    self.standings = previous;
                    return Err(e);
                }
            };
            log::debug!("Schedule: {}", self.describe(&pairings));

            self.play_round(&pairings, self.config.format_for_round(round_no))?;
            rounds.push(pairings);
        }
        Ok(rounds)
    }

    /// Open with `ceil(count * random_share)` random rounds, then play the rest
    /// as Swiss rounds on the standings those produced
    pub fn run_random_then_swiss_rounds(&mut self, count: usize) -> Result<Vec<Vec<Pairing>>> {
        let random = self.config.random_rounds_of(count);
        let mut rounds = self.run_random_rounds(random)?;
        rounds.extend(self.run_swiss_rounds(count - random)?);
        Ok(rounds)
    }

    /// Play a full round robin (`len() - 1` rounds) from the current order
    pub fn run_round_robin_rounds(&mut self) -> Result<Vec<Vec<Pairing>>> {
        let rounds = round_robin(&self.standings)?;
        log::info!("{}: playing {} round-robin rounds", self.name, rounds.len());

        for pairings in &rounds {
            let round_no = self.stats.rounds_played + 1;
            log::debug!("Round {}: {}", round_no, self.describe(pairings));
            self.play_round(pairings, self.config.format_for_round(round_no))?;
        }
        Ok(rounds)
    }

    /// Swiss weeks of several matches each. All of a week's rounds are paired
    /// against the same standings before any of them is played; the field is
    /// re-sorted once the week is over. A week that cannot be fully paired
    /// leaves the season as it was before the week.
    pub fn run_swiss_tuple_rounds(
        &mut self,
        weeks: usize,
        matches_per_week: usize,
    ) -> Result<Vec<Vec<Pairing>>> {
        if matches_per_week == 0 {
            return Err(SeasonError::InvalidConfiguration(
                "matches_per_week must be at least 1".to_string(),
            ));
        }

        let mut rounds = Vec::with_capacity(weeks * matches_per_week);
        for week in 1..=weeks {
            let first_round = self.stats.rounds_played + 1;
            let format = self.config.format_for_round(first_round);
            log::info!("{}: scheduling week {} ({} matches)", self.name, week, matches_per_week);

            let mut week_rounds: Vec<Vec<Pairing>> = Vec::with_capacity(matches_per_week);
            for offset in 0..matches_per_week {
                match self.schedule_swiss_round(first_round + offset) {
                    Ok(pairings) => {
                        for p in &pairings {
                            self.mark_faced(p.home, p.away);
                        }
                        week_rounds.push(pairings);
                    }
                    Err(e) => {
                        for p in week_rounds.iter().flatten() {
                            self.unmark_faced(p.home, p.away);
                        }
                        return Err(e);
                    }
                }
            }

            // Faced marks are already in place; play without re-sorting between rounds
            for pairings in &week_rounds {
                log::debug!("Week {}: {}", week, self.describe(pairings));
                let mut results = Vec::with_capacity(pairings.len());
                for p in pairings {
                    let (home, away) = (&self.competitors[p.home.index()], &self.competitors[p.away.index()]);
                    results.push((*p, self.simulator.play(home, away, format, &mut self.rng)?));
                }
                for (p, (home_record, away_record)) in results {
                    self.apply_match(p, &home_record, &away_record, format);
                }
                self.stats.rounds_played += 1;
            }

            self.sort_standings();
            log::debug!("Standings after week {}:\n{}", week, self);
            rounds.extend(week_rounds);
        }
        Ok(rounds)
    }

    /// Drive the season under `discipline`. Round robin ignores `count`.
    pub fn run(&mut self, discipline: Discipline, count: usize) -> Result<Vec<Vec<Pairing>>> {
        match discipline {
            Discipline::Swiss => self.run_swiss_rounds(count),
            Discipline::Random => self.run_random_rounds(count),
            Discipline::RoundRobin => self.run_round_robin_rounds(),
            Discipline::RandomThenSwiss => self.run_random_then_swiss_rounds(count),
        }
    }

    /// Names of a round's pairings, for logs
    pub fn describe(&self, pairings: &[Pairing]) -> String {
        let parts: Vec<String> = pairings
            .iter()
            .map(|p| {
                format!(
                    "[{}, {}]",
                    self.competitors[p.home.index()].name,
                    self.competitors[p.away.index()].name
                )
            })
            .collect();
        format!("[{}]", parts.join(", "))
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Division {} with {} teams", self.name, self.competitors.len())?;
        writeln!(f, "Name,Skill,W,L,RW,RL,MP,Teams Faced")?;
        for row in self.standings_table() {
            writeln!(
                f,
                "{},{:.3},{},{},{},{},{},[{}]",
                row.name,
                row.skill,
                row.wins,
                row.losses,
                row.rounds_won,
                row.rounds_lost,
                row.points,
                row.faced.join(", ")
            )?;
        }
        Ok(())
    }
}

/// Create a season with the default configuration
pub fn create_season(
    name: &str,
    competitor_count: usize,
    distribution: SkillDistribution,
    seed: Option<u64>,
) -> Result<Season> {
    Season::new(name, competitor_count, distribution, seed, SeasonConfig::default())
}
