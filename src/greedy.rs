use std::rc::Rc;
use std::time::Instant;

use fastrand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bitset::Bitset;
use crate::error::{Error, Result};
use crate::instance::Instance;
use crate::solution::{self, Solution, SolutionSerial};

/// tie handling of the deterministic best-addition loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TieBreak {
    /// accept strict improvements only: the first index reaching the maximum wins
    Strict,
    /// accept equal coverage too: the last index reaching the maximum wins
    NonStrict,
}

/** Best-addition loop shared by every deterministic variant. Extends
`solution` until it covers all points, considering only subsets allowed by
`authorized_subsets` (all of them when absent). */
fn greedy_loop(
    solution: &mut Solution,
    authorized_subsets: Option<&Bitset>,
    tie_break: TieBreak,
) -> Result<()> {
    let instance = Rc::clone(solution.instance());
    let subsets_number = instance.subsets_number();
    while !solution.cover_all_points {
        let mut max_subset_number = subsets_number; // invalid initial value
        let mut covered_points_with_max_subset = Bitset::new(instance.points_number());
        let mut covered_points_number_with_max_subset = solution.covered_points.count();
        let mut new_covered_points = Bitset::new(instance.points_number());
        for i_subset in 0..subsets_number {
            if let Some(authorized) = authorized_subsets {
                if !authorized.test(i_subset) {
                    continue;
                }
            }
            if solution.selected_subsets.test(i_subset) {
                // already selected
                continue;
            }

            new_covered_points.copy_from(&solution.covered_points);
            new_covered_points.union_with(instance.subset_points(i_subset));
            let new_covered_points_number = new_covered_points.count();
            let improves = match tie_break {
                TieBreak::Strict => new_covered_points_number > covered_points_number_with_max_subset,
                TieBreak::NonStrict => {
                    new_covered_points_number >= covered_points_number_with_max_subset
                }
            };
            if improves {
                max_subset_number = i_subset;
                covered_points_with_max_subset.copy_from(&new_covered_points);
                covered_points_number_with_max_subset = new_covered_points_number;
            }
        }

        // all subsets already included or no subset adds covered points
        if max_subset_number == subsets_number {
            return Err(Error::NoSolution(instance.name().to_string()));
        }

        solution.selected_subsets.set(max_subset_number);
        solution.covered_points.copy_from(&covered_points_with_max_subset);
        solution.cover_all_points = solution.covered_points.all();
    }
    Ok(())
}

/** Best-addition loop with uniform reservoir tie-breaking: a strict
improvement resets the tie counter, an equality replaces the incumbent with
probability `1/c` so every tying subset is equally likely. */
fn random_greedy_loop(
    solution: &mut Solution,
    authorized_subsets: Option<&Bitset>,
    rng: &mut Rng,
) -> Result<()> {
    let instance = Rc::clone(solution.instance());
    let subsets_number = instance.subsets_number();
    let mut equal_counter: usize = 0;
    while !solution.cover_all_points {
        let mut max_subset_number = subsets_number; // invalid initial value
        let mut covered_points_with_max_subset = Bitset::new(instance.points_number());
        let mut covered_points_number_with_max_subset = solution.covered_points.count();
        let mut new_covered_points = Bitset::new(instance.points_number());
        for i_subset in 0..subsets_number {
            if let Some(authorized) = authorized_subsets {
                if !authorized.test(i_subset) {
                    continue;
                }
            }
            if solution.selected_subsets.test(i_subset) {
                // already selected
                continue;
            }

            new_covered_points.copy_from(&solution.covered_points);
            new_covered_points.union_with(instance.subset_points(i_subset));
            let new_covered_points_number = new_covered_points.count();
            if new_covered_points_number > covered_points_number_with_max_subset {
                max_subset_number = i_subset;
                covered_points_with_max_subset.copy_from(&new_covered_points);
                covered_points_number_with_max_subset = new_covered_points_number;
                equal_counter = 1;
            } else if new_covered_points_number == covered_points_number_with_max_subset {
                equal_counter += 1;
                if rng.f64() < 1.0 / equal_counter as f64 {
                    max_subset_number = i_subset;
                    covered_points_with_max_subset.copy_from(&new_covered_points);
                }
            }
        }

        // all subsets already included or no subset adds covered points
        if max_subset_number == subsets_number {
            return Err(Error::NoSolution(instance.name().to_string()));
        }

        solution.selected_subsets.set(max_subset_number);
        solution.covered_points.copy_from(&covered_points_with_max_subset);
        solution.cover_all_points = solution.covered_points.all();
    }
    Ok(())
}

/// completes a partial solution with the strict deterministic loop
pub(crate) fn complete_solve(solution: &mut Solution, authorized_subsets: Option<&Bitset>) -> Result<()> {
    greedy_loop(solution, authorized_subsets, TieBreak::Strict)
}

/// completes a partial solution with the random loop
pub(crate) fn complete_random_solve(
    solution: &mut Solution,
    authorized_subsets: Option<&Bitset>,
    rng: &mut Rng,
) -> Result<()> {
    random_greedy_loop(solution, authorized_subsets, rng)
}

fn solve_report_impl(
    instance: &Rc<Instance>,
    authorized_subsets: Option<&Bitset>,
    tie_break: TieBreak,
) -> Result<GreedyReport> {
    if let Some(authorized) = authorized_subsets {
        assert_eq!(authorized.len(), instance.subsets_number());
    }
    debug!("({}) Start building greedy solution", instance.name());
    let timer = Instant::now();

    let mut report = GreedyReport::new(Rc::clone(instance));
    greedy_loop(&mut report.solution_final, authorized_subsets, tie_break)?;

    report.time = timer.elapsed().as_secs_f64();
    report.solution_final.compute_cover();
    if !report.solution_final.cover_all_points {
        return Err(Error::InternalInvariant(format!(
            "({}) greedy solution does not cover all points",
            instance.name()
        )));
    }
    debug!(
        "({}) Built greedy solution with {} subsets in {}s",
        instance.name(),
        report.solution_final.selected_subsets.count(),
        report.time
    );
    Ok(report)
}

fn random_solve_report_impl(
    instance: &Rc<Instance>,
    authorized_subsets: Option<&Bitset>,
    rng: &mut Rng,
) -> Result<GreedyReport> {
    if let Some(authorized) = authorized_subsets {
        assert_eq!(authorized.len(), instance.subsets_number());
    }
    debug!("({}) Start building random greedy solution", instance.name());
    let timer = Instant::now();

    let mut report = GreedyReport::new(Rc::clone(instance));
    random_greedy_loop(&mut report.solution_final, authorized_subsets, rng)?;

    report.time = timer.elapsed().as_secs_f64();
    report.solution_final.compute_cover();
    if !report.solution_final.cover_all_points {
        return Err(Error::InternalInvariant(format!(
            "({}) random greedy solution does not cover all points",
            instance.name()
        )));
    }
    debug!(
        "({}) Built random greedy solution with {} subsets in {}s",
        instance.name(),
        report.solution_final.selected_subsets.count(),
        report.time
    );
    Ok(report)
}

/// strict deterministic greedy: first index wins ties
pub fn solve(instance: &Rc<Instance>) -> Result<Solution> {
    solve_report(instance).map(|report| report.solution_final)
}

/// strict deterministic greedy, with the construction report
pub fn solve_report(instance: &Rc<Instance>) -> Result<GreedyReport> {
    solve_report_impl(instance, None, TieBreak::Strict)
}

/// non-strict deterministic greedy: last tying index wins
pub fn rsolve(instance: &Rc<Instance>) -> Result<Solution> {
    rsolve_report(instance).map(|report| report.solution_final)
}

/// non-strict deterministic greedy, with the construction report
pub fn rsolve_report(instance: &Rc<Instance>) -> Result<GreedyReport> {
    solve_report_impl(instance, None, TieBreak::NonStrict)
}

/// randomized greedy: ties resolved uniformly at random
pub fn random_solve(instance: &Rc<Instance>, rng: &mut Rng) -> Result<Solution> {
    random_solve_report(instance, rng).map(|report| report.solution_final)
}

/// randomized greedy, with the construction report
pub fn random_solve_report(instance: &Rc<Instance>, rng: &mut Rng) -> Result<GreedyReport> {
    random_solve_report_impl(instance, None, rng)
}

/// strict greedy restricted to an authorized subset family
pub fn restricted_solve(instance: &Rc<Instance>, authorized_subsets: &Bitset) -> Result<Solution> {
    restricted_solve_report(instance, authorized_subsets).map(|report| report.solution_final)
}

/// strict restricted greedy, with the construction report
pub fn restricted_solve_report(
    instance: &Rc<Instance>,
    authorized_subsets: &Bitset,
) -> Result<GreedyReport> {
    solve_report_impl(instance, Some(authorized_subsets), TieBreak::Strict)
}

/// non-strict greedy restricted to an authorized subset family
pub fn restricted_rsolve(instance: &Rc<Instance>, authorized_subsets: &Bitset) -> Result<Solution> {
    restricted_rsolve_report(instance, authorized_subsets).map(|report| report.solution_final)
}

/// non-strict restricted greedy, with the construction report
pub fn restricted_rsolve_report(
    instance: &Rc<Instance>,
    authorized_subsets: &Bitset,
) -> Result<GreedyReport> {
    solve_report_impl(instance, Some(authorized_subsets), TieBreak::NonStrict)
}

/// randomized greedy restricted to an authorized subset family
pub fn restricted_random_solve(
    instance: &Rc<Instance>,
    authorized_subsets: &Bitset,
    rng: &mut Rng,
) -> Result<Solution> {
    restricted_random_solve_report(instance, authorized_subsets, rng)
        .map(|report| report.solution_final)
}

/// randomized restricted greedy, with the construction report
pub fn restricted_random_solve_report(
    instance: &Rc<Instance>,
    authorized_subsets: &Bitset,
    rng: &mut Rng,
) -> Result<GreedyReport> {
    random_solve_report_impl(instance, Some(authorized_subsets), rng)
}

/// greedy construction report: the solution and the wall time spent building it
#[derive(Debug, Clone)]
pub struct GreedyReport {
    /// the covering solution that was built
    pub solution_final: Solution,
    /// construction wall time in seconds
    pub time: f64,
}

impl GreedyReport {
    /// empty report over `instance`
    pub fn new(instance: Rc<Instance>) -> Self {
        Self {
            solution_final: Solution::new(instance),
            time: 0.0,
        }
    }

    /// snapshot for the serialization boundary
    pub fn serialize(&self) -> GreedyReportSerial {
        GreedyReportSerial {
            solution_final: self.solution_final.serialize(),
            time: self.time,
        }
    }

    /// restores a report from a snapshot, false when the solution does not load
    pub fn load(&mut self, serial: &GreedyReportSerial) -> bool {
        if !self.solution_final.load(&serial.solution_final) {
            warn!("Failed to load greedy solution");
            return false;
        }
        self.time = serial.time;
        true
    }
}

/// serializable greedy report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreedyReportSerial {
    /// final solution snapshot
    pub solution_final: SolutionSerial,
    /// construction wall time in seconds
    pub time: f64,
}

/// expands a report computed on a reduced instance to its parent instance
pub fn expand(reduced_report: &GreedyReport) -> Result<GreedyReport> {
    let solution_final = solution::expand(&reduced_report.solution_final)?;
    Ok(GreedyReport {
        solution_final,
        time: reduced_report.time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::tests::instance_from_lists;

    #[test]
    fn test_trivial_partition() {
        // every subset is mandatory
        let instance = Rc::new(instance_from_lists("trivial", 3, &[&[0], &[1], &[2]]));
        let mut rng = Rng::with_seed(0);
        for solution in [
            solve(&instance).unwrap(),
            rsolve(&instance).unwrap(),
            random_solve(&instance, &mut rng).unwrap(),
        ] {
            assert!(solution.cover_all_points);
            assert_eq!(solution.selected_subsets.count(), 3);
        }
    }

    #[test]
    fn test_redundant_subsets() {
        // subset 0 covers everything by itself
        let instance = Rc::new(instance_from_lists(
            "redundant",
            3,
            &[&[0, 1, 2], &[0], &[1], &[2]],
        ));
        let solution = solve(&instance).unwrap();
        assert!(solution.cover_all_points);
        assert_eq!(solution.selected_subsets.ones().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_no_solution() {
        let instance = Rc::new(instance_from_lists("unsolvable", 3, &[&[0], &[1]]));
        assert!(matches!(solve(&instance), Err(Error::NoSolution(_))));
        assert!(matches!(rsolve(&instance), Err(Error::NoSolution(_))));
        let mut rng = Rng::with_seed(0);
        assert!(matches!(random_solve(&instance, &mut rng), Err(Error::NoSolution(_))));
    }

    #[test]
    fn test_strict_tie_breaking() {
        let instance = Rc::new(instance_from_lists(
            "ties",
            4,
            &[&[0, 1], &[2, 3], &[0, 2]],
        ));
        // first encountered index wins: subset 0 then subset 1
        let solution = solve(&instance).unwrap();
        assert_eq!(solution.selected_subsets.ones().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_random_tie_breaking_is_uniform() {
        let instance = Rc::new(instance_from_lists(
            "ties",
            4,
            &[&[0, 1], &[2, 3], &[0, 2]],
        ));
        let mut rng = Rng::with_seed(123);
        let mut covers = [0usize; 2];
        for _ in 0..300 {
            let solution = random_solve(&instance, &mut rng).unwrap();
            assert!(solution.cover_all_points);
            assert_eq!(solution.selected_subsets.count(), 2);
            match solution.selected_subsets.ones().collect::<Vec<_>>().as_slice() {
                [0, 1] => covers[0] += 1,
                [1, 2] => covers[1] += 1,
                other => panic!("unexpected cover {:?}", other),
            }
        }
        // both two-subset covers must show up under a fair tie-break
        assert!(covers.iter().all(|&count| count > 30));
    }

    #[test]
    fn test_random_solve_determinism() {
        let instance = Rc::new(instance_from_lists(
            "seeded",
            6,
            &[&[0, 1, 2], &[3, 4], &[5], &[0, 3], &[1, 4, 5], &[2]],
        ));
        let first = random_solve(&instance, &mut Rng::with_seed(99)).unwrap();
        let second = random_solve(&instance, &mut Rng::with_seed(99)).unwrap();
        assert_eq!(first.selected_subsets, second.selected_subsets);
    }

    #[test]
    fn test_restricted_solve() {
        let instance = Rc::new(instance_from_lists(
            "restricted",
            3,
            &[&[0, 1, 2], &[0, 1], &[2]],
        ));
        // forbid the dominating subset 0
        let mut authorized = Bitset::new(3);
        authorized.set(1);
        authorized.set(2);
        let solution = restricted_solve(&instance, &authorized).unwrap();
        assert_eq!(solution.selected_subsets.ones().collect::<Vec<_>>(), vec![1, 2]);

        // restriction to subset 1 alone cannot cover
        let mut too_small = Bitset::new(3);
        too_small.set(1);
        assert!(matches!(
            restricted_solve(&instance, &too_small),
            Err(Error::NoSolution(_))
        ));
    }

    #[test]
    fn test_report_roundtrip() {
        let instance = Rc::new(instance_from_lists("report", 3, &[&[0, 1], &[2]]));
        let report = solve_report(&instance).unwrap();
        let serial = report.serialize();
        let mut loaded = GreedyReport::new(Rc::clone(&instance));
        assert!(loaded.load(&serial));
        assert_eq!(loaded.serialize(), serial);
        assert_eq!(
            loaded.solution_final.selected_subsets,
            report.solution_final.selected_subsets
        );
    }
}
