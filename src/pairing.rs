//! Round pairing: Swiss depth-first search and the round-robin circle method

use crate::error::{Result, SeasonError};
use crate::types::*;

/// Node kinds of the implicit pairing tree
#[derive(Clone, Copy, Debug)]
enum Node {
    /// Open a new pairing with the highest unpaired competitor at home
    Home,
    /// Try the competitor at this standings position as the pending home side's opponent
    Away(usize),
}

/// Result of a successful Swiss search
#[derive(Clone, Debug)]
pub struct SwissOutcome {
    pub pairings: Vec<Pairing>,
    pub backtracks: usize,
    pub nodes_visited: usize,
}

/// Depth-first backtracking search for one Swiss round.
///
/// Walks the field in standings order. Each unpaired competitor at the top
/// of the list takes the home side and is matched with the highest-ranked
/// remaining competitor it has not met; if the rest of the field cannot be
/// completed after that choice the pair is undone and the next candidate
/// tried. The working schedule is a single flat vector of standings
/// positions (even = home, odd = away) pushed and popped in place.
pub struct SwissSearch<'a> {
    order: &'a [CompetitorId],
    arena: &'a [Competitor],
    round: usize,
    paired: Vec<bool>,
    unpaired: usize,
    schedule: Vec<usize>,
    backtracks: usize,
    nodes_visited: usize,
}

impl<'a> SwissSearch<'a> {
    /// `order` must already be in standings order and include the bye if any
    pub fn new(order: &'a [CompetitorId], arena: &'a [Competitor]) -> Self {
        Self {
            order,
            arena,
            round: 1,
            paired: vec![false; order.len()],
            unpaired: order.len(),
            schedule: Vec::with_capacity(order.len()),
            backtracks: 0,
            nodes_visited: 0,
        }
    }

    /// Round number reported if the search fails
    pub fn for_round(mut self, round: usize) -> Self {
        self.round = round;
        self
    }

    pub fn run(mut self) -> Result<SwissOutcome> {
        if !self.search(Node::Home)? {
            return Err(SeasonError::SchedulingInfeasible {
                round: self.round,
                competitors: self.order.len(),
            });
        }

        let pairings = self
            .schedule
            .chunks_exact(2)
            .map(|pair| Pairing::new(self.order[pair[0]], self.order[pair[1]]))
            .collect();

        Ok(SwissOutcome {
            pairings,
            backtracks: self.backtracks,
            nodes_visited: self.nodes_visited,
        })
    }

    fn search(&mut self, node: Node) -> Result<bool> {
        self.nodes_visited += 1;

        match node {
            Node::Home => {
                if self.unpaired == 0 {
                    return Ok(true);
                }
                if self.unpaired == 1 {
                    return Err(SeasonError::InvariantViolation(format!(
                        "odd competitor left unpaired in round {} (is the bye missing?)",
                        self.round
                    )));
                }

                let home = match self.paired.iter().position(|&p| !p) {
                    Some(pos) => pos,
                    None => return Ok(true),
                };
                self.take(home);

                for candidate in home + 1..self.order.len() {
                    if self.paired[candidate] || self.already_met(home, candidate) {
                        continue;
                    }
                    if self.search(Node::Away(candidate))? {
                        return Ok(true);
                    }
                }

                self.release(home);
                Ok(false)
            }
            Node::Away(candidate) => {
                // Last entrant completes the schedule
                if self.unpaired == 1 {
                    self.take(candidate);
                    return Ok(true);
                }

                self.take(candidate);
                if self.search(Node::Home)? {
                    return Ok(true);
                }

                self.release(candidate);
                self.backtracks += 1;
                log::trace!(
                    "round {}: backtracking off {} at depth {}",
                    self.round,
                    self.arena[self.order[candidate].index()].name,
                    self.schedule.len()
                );
                Ok(false)
            }
        }
    }

    fn already_met(&self, a: usize, b: usize) -> bool {
        let (ca, cb) = (&self.arena[self.order[a].index()], &self.arena[self.order[b].index()]);
        ca.has_faced(cb.id) || cb.has_faced(ca.id)
    }

    fn take(&mut self, pos: usize) {
        self.paired[pos] = true;
        self.unpaired -= 1;
        self.schedule.push(pos);
    }

    fn release(&mut self, pos: usize) {
        let popped = self.schedule.pop();
        debug_assert_eq!(popped, Some(pos));
        self.paired[pos] = false;
        self.unpaired += 1;
    }
}

/// Schedule one Swiss round over `order` (standings order, even length)
pub fn schedule_swiss(order: &[CompetitorId], arena: &[Competitor]) -> Result<Vec<Pairing>> {
    SwissSearch::new(order, arena).run().map(|outcome| outcome.pairings)
}

/// Full round-robin by the circle method: `order[0]` stays fixed while the
/// rest rotate one place per round. Yields `n - 1` rounds in which every
/// pair meets exactly once.
pub fn round_robin(order: &[CompetitorId]) -> Result<Vec<Vec<Pairing>>> {
    let n = order.len();
    if n < 2 {
        return Err(SeasonError::InvalidConfiguration(format!(
            "round robin needs at least 2 competitors, got {}",
            n
        )));
    }
    if n % 2 != 0 {
        return Err(SeasonError::InvariantViolation(format!(
            "round robin over an odd field of {} (is the bye missing?)",
            n
        )));
    }

    let fixed = order[0];
    let mut rotating: Vec<CompetitorId> = order[1..].to_vec();
    let mut rounds = Vec::with_capacity(n - 1);

    for _ in 0..n - 1 {
        let mut current = Vec::with_capacity(n);
        current.push(fixed);
        current.extend_from_slice(&rotating);

        let round = (0..n / 2)
            .map(|j| Pairing::new(current[j], current[n - j - 1]))
            .collect();
        rounds.push(round);

        rotating.rotate_left(1);
    }

    Ok(rounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn field(n: usize) -> (Vec<Competitor>, Vec<CompetitorId>) {
        let arena: Vec<Competitor> = (0..n)
            .map(|i| Competitor::new(CompetitorId(i), format!("Team {}", i), 0.0))
            .collect();
        let order = (0..n).map(CompetitorId).collect();
        (arena, order)
    }

    fn face(arena: &mut [Competitor], a: usize, b: usize) {
        arena[a].faced.insert(CompetitorId(b));
        arena[b].faced.insert(CompetitorId(a));
    }

    fn assert_valid_round(pairings: &[Pairing], arena: &[Competitor], n: usize) {
        assert_eq!(pairings.len(), n / 2);
        let mut seen = HashSet::new();
        for p in pairings {
            assert!(seen.insert(p.home), "{} paired twice", p.home);
            assert!(seen.insert(p.away), "{} paired twice", p.away);
            assert!(!arena[p.home.index()].has_faced(p.away));
            assert!(!arena[p.away.index()].has_faced(p.home));
        }
        assert_eq!(seen.len(), n);
    }

    #[test]
    fn test_fresh_field_pairs_neighbours() {
        let (arena, order) = field(6);
        let pairings = schedule_swiss(&order, &arena).unwrap();
        let ids: Vec<_> = pairings.iter().map(|p| (p.home.0, p.away.0)).collect();
        assert_eq!(ids, vec![(0, 1), (2, 3), (4, 5)]);
    }

    #[test]
    fn test_backtracks_out_of_dead_end() {
        let (mut arena, order) = field(4);
        face(&mut arena, 2, 3);

        let outcome = SwissSearch::new(&order, &arena).run().unwrap();
        let ids: Vec<_> = outcome.pairings.iter().map(|p| (p.home.0, p.away.0)).collect();
        assert_eq!(ids, vec![(0, 2), (1, 3)]);
        assert_eq!(outcome.backtracks, 1);
    }

    #[test]
    fn test_infeasible_round() {
        let (mut arena, order) = field(4);
        face(&mut arena, 0, 1);
        face(&mut arena, 0, 2);
        face(&mut arena, 0, 3);

        let err = SwissSearch::new(&order, &arena).for_round(5).run().unwrap_err();
        assert_eq!(err, SeasonError::SchedulingInfeasible { round: 5, competitors: 4 });
    }

    #[test]
    fn test_odd_leftover_is_invariant_violation() {
        let (arena, order) = field(3);
        let err = schedule_swiss(&order, &arena).unwrap_err();
        assert!(matches!(err, SeasonError::InvariantViolation(_)));
    }

    #[test]
    fn test_empty_field() {
        let (arena, order) = field(0);
        assert!(schedule_swiss(&order, &arena).unwrap().is_empty());
    }

    #[test]
    fn test_faced_set_checked_both_ways() {
        let (mut arena, order) = field(4);
        // One-sided history still blocks the rematch
        arena[1].faced.insert(CompetitorId(0));
        let pairings = schedule_swiss(&order, &arena).unwrap();
        assert!(pairings.iter().all(|p| !(p.involves(CompetitorId(0)) && p.involves(CompetitorId(1)))));
    }

    #[test]
    fn test_feasible_after_partial_round_robin() {
        let n = 10;
        let (_, order) = field(n);
        let rr = round_robin(&order).unwrap();

        for played in 0..n - 1 {
            let (mut arena, order) = field(n);
            for round in rr.iter().take(played) {
                for p in round {
                    face(&mut arena, p.home.0, p.away.0);
                }
            }
            let pairings = schedule_swiss(&order, &arena)
                .unwrap_or_else(|e| panic!("after {} rounds: {}", played, e));
            assert_valid_round(&pairings, &arena, n);
        }

        // Everyone has met everyone
        let (mut arena, order) = field(n);
        for round in &rr {
            for p in round {
                face(&mut arena, p.home.0, p.away.0);
            }
        }
        assert!(matches!(
            schedule_swiss(&order, &arena),
            Err(SeasonError::SchedulingInfeasible { .. })
        ));
    }

    /// 16 teams after four weeks of real history; the list is in the order
    /// the teams were entered, not re-sorted.
    #[test]
    fn test_sixteen_team_history() {
        let names = [
            "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P",
        ];
        let (mut arena, order) = field(names.len());
        for (c, name) in arena.iter_mut().zip(names) {
            c.name = name.to_string();
        }

        let history = [
            (0, 1), (0, 4), (0, 5), (0, 9), (1, 2), (1, 3), (1, 7), (2, 7),
            (2, 13), (2, 14), (3, 8), (3, 9), (3, 10), (4, 5), (4, 12), (4, 15),
            (5, 6), (5, 12), (6, 9), (6, 12), (6, 15), (7, 8), (7, 13), (8, 13),
            (8, 14), (9, 11), (10, 11), (10, 12), (10, 15), (11, 13), (11, 14), (14, 15),
        ];
        for (a, b) in history {
            face(&mut arena, a, b);
        }

        let pairings = schedule_swiss(&order, &arena).unwrap();
        let named: Vec<[&str; 2]> = pairings
            .iter()
            .map(|p| [arena[p.home.index()].name.as_str(), arena[p.away.index()].name.as_str()])
            .collect();
        assert_eq!(
            named,
            vec![
                ["A", "C"],
                ["B", "E"],
                ["D", "F"],
                ["G", "H"],
                ["I", "J"],
                ["K", "N"],
                ["L", "P"],
                ["M", "O"],
            ]
        );
    }

    #[test]
    fn test_round_robin_properties() {
        for n in [2, 4, 8, 12] {
            let (_, order) = field(n);
            let rounds = round_robin(&order).unwrap();
            assert_eq!(rounds.len(), n - 1);

            let mut pairs = HashSet::new();
            for round in &rounds {
                let mut seen = HashSet::new();
                for p in round {
                    assert!(seen.insert(p.home));
                    assert!(seen.insert(p.away));
                    let key = (p.home.min(p.away), p.home.max(p.away));
                    assert!(pairs.insert(key), "pair {:?} repeated", key);
                }
                assert_eq!(seen.len(), n);
            }
            assert_eq!(pairs.len(), n * (n - 1) / 2);
        }
    }

    #[test]
    fn test_round_robin_rejects_bad_fields() {
        let (_, order) = field(1);
        assert!(matches!(round_robin(&order), Err(SeasonError::InvalidConfiguration(_))));
        let (_, order) = field(5);
        assert!(matches!(round_robin(&order), Err(SeasonError::InvariantViolation(_))));
    }
}
