//! Standings order: points, then Median Buchholz, bye always last

use crate::types::{Competitor, CompetitorId};
use std::cmp::Ordering;

/// Sum of faced opponents' current points with the single best and single
/// worst dropped. Zero when nobody has been faced yet.
pub fn median_buchholz(competitor: &Competitor, arena: &[Competitor]) -> i64 {
    let mut opponents = competitor
        .faced
        .iter()
        .filter_map(|id| arena.get(id.index()))
        .map(|c| c.points as i64)
        .peekable();

    if opponents.peek().is_none() {
        return 0;
    }

    let mut sum = 0;
    let mut max = i64::MIN;
    let mut min = i64::MAX;
    for points in opponents {
        sum += points;
        max = max.max(points);
        min = min.min(points);
    }
    sum - max - min
}

/// Descending standings order over one arena. Tiebreak scores are computed
/// once up front so a sort does not rescan faced sets per comparison.
pub struct StandingsComparator<'a> {
    arena: &'a [Competitor],
    buchholz: Vec<i64>,
}

impl<'a> StandingsComparator<'a> {
    pub fn new(arena: &'a [Competitor]) -> Self {
        let buchholz = arena.iter().map(|c| median_buchholz(c, arena)).collect();
        Self { arena, buchholz }
    }

    pub fn buchholz(&self, id: CompetitorId) -> i64 {
        self.buchholz[id.index()]
    }

    /// `Less` means `a` ranks above `b`. Equal points and tiebreak compare
    /// `Equal`; a stable sort then keeps their previous relative order.
    pub fn compare(&self, a: CompetitorId, b: CompetitorId) -> Ordering {
        let (ca, cb) = (&self.arena[a.index()], &self.arena[b.index()]);
        match (ca.is_bye, cb.is_bye) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            (false, false) => {}
        }

        cb.points
            .cmp(&ca.points)
            .then_with(|| self.buchholz(b).cmp(&self.buchholz(a)))
    }

    /// Stable sort of `order` into standings order
    pub fn sort(&self, order: &mut [CompetitorId]) {
        order.sort_by(|&a, &b| self.compare(a, b));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena(points: &[u32]) -> Vec<Competitor> {
        points
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let mut c = Competitor::new(CompetitorId(i), format!("Team {}", i), 0.0);
                c.points = p;
                c
            })
            .collect()
    }

    fn face(arena: &mut [Competitor], a: usize, b: usize) {
        arena[a].faced.insert(CompetitorId(b));
        arena[b].faced.insert(CompetitorId(a));
    }

    #[test]
    fn test_median_buchholz_drops_best_and_worst() {
        let mut teams = arena(&[0, 9, 6, 3, 1]);
        face(&mut teams, 0, 1);
        face(&mut teams, 0, 2);
        face(&mut teams, 0, 3);
        face(&mut teams, 0, 4);
        // 9 + 6 + 3 + 1 - 9 - 1
        assert_eq!(median_buchholz(&teams[0], &teams), 9);
    }

    #[test]
    fn test_median_buchholz_small_histories() {
        let mut teams = arena(&[0, 7, 2]);
        assert_eq!(median_buchholz(&teams[0], &teams), 0);

        face(&mut teams, 0, 1);
        assert_eq!(median_buchholz(&teams[0], &teams), -7);

        face(&mut teams, 0, 2);
        assert_eq!(median_buchholz(&teams[0], &teams), 0);
    }

    #[test]
    fn test_points_dominate() {
        let teams = arena(&[3, 12, 7]);
        let cmp = StandingsComparator::new(&teams);
        let mut order = vec![CompetitorId(0), CompetitorId(1), CompetitorId(2)];
        cmp.sort(&mut order);
        assert_eq!(order, vec![CompetitorId(1), CompetitorId(2), CompetitorId(0)]);
    }

    #[test]
    fn test_tiebreak_on_buchholz() {
        // 0 and 1 level on points; 0 faced stronger opposition
        let mut teams = arena(&[10, 10, 9, 8, 7, 1, 0, 2]);
        face(&mut teams, 0, 2);
        face(&mut teams, 0, 3);
        face(&mut teams, 0, 4);
        face(&mut teams, 1, 5);
        face(&mut teams, 1, 6);
        face(&mut teams, 1, 7);

        let cmp = StandingsComparator::new(&teams);
        assert_eq!(cmp.buchholz(CompetitorId(0)), 8);
        assert_eq!(cmp.buchholz(CompetitorId(1)), 1);
        assert_eq!(cmp.compare(CompetitorId(0), CompetitorId(1)), Ordering::Less);
        assert_eq!(cmp.compare(CompetitorId(1), CompetitorId(0)), Ordering::Greater);
    }

    #[test]
    fn test_bye_always_last() {
        let mut teams = arena(&[0, 4]);
        let mut bye = Competitor::bye(CompetitorId(2));
        bye.points = 100;
        teams.push(bye);

        let cmp = StandingsComparator::new(&teams);
        assert_eq!(cmp.compare(CompetitorId(2), CompetitorId(0)), Ordering::Greater);
        assert_eq!(cmp.compare(CompetitorId(0), CompetitorId(2)), Ordering::Less);

        let mut order = vec![CompetitorId(2), CompetitorId(0), CompetitorId(1)];
        cmp.sort(&mut order);
        assert_eq!(order.last(), Some(&CompetitorId(2)));
    }

    #[test]
    fn test_order_is_consistent() {
        let teams = arena(&[5, 5, 9, 0, 3, 9]);
        let cmp = StandingsComparator::new(&teams);
        let ids: Vec<_> = (0..teams.len()).map(CompetitorId).collect();
        for &a in &ids {
            assert_eq!(cmp.compare(a, a), Ordering::Equal);
            for &b in &ids {
                assert_eq!(cmp.compare(a, b), cmp.compare(b, a).reverse());
                if teams[a.index()].points > teams[b.index()].points {
                    assert_eq!(cmp.compare(a, b), Ordering::Less);
                }
                for &c in &ids {
                    if cmp.compare(a, b) == Ordering::Less && cmp.compare(b, c) == Ordering::Less {
                        assert_eq!(cmp.compare(a, c), Ordering::Less);
                    }
                }
            }
        }
    }

    #[test]
    fn test_full_ties_keep_previous_order() {
        let teams = arena(&[4, 4, 4]);
        let cmp = StandingsComparator::new(&teams);
        let mut order = vec![CompetitorId(2), CompetitorId(0), CompetitorId(1)];
        cmp.sort(&mut order);
        assert_eq!(order, vec![CompetitorId(2), CompetitorId(0), CompetitorId(1)]);
    }
}
