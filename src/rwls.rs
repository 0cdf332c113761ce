use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Instant;

use fastrand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::bitset::Bitset;
use crate::error::Result;
use crate::instance::Instance;
use crate::solution::{self, Solution, SolutionSerial};

/// per-point weight learned during the search
pub type Weight = i64;

/// bounded length of the tabu FIFO
const TABU_LIST_LENGTH: usize = 15;

/** A two-dimensional budget: discrete steps and wall-clock seconds. Also
used to report where the best solution was found. */
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// number of search steps
    pub steps: usize,
    /// seconds
    pub time: f64,
}

impl Position {
    /// position zero
    pub fn zero() -> Self {
        Self { steps: 0, time: 0.0 }
    }

    /// budget that never stops the search
    pub fn unlimited() -> Self {
        Self {
            steps: usize::MAX,
            time: f64::MAX,
        }
    }

    /// true iff either component reached `limit`
    pub fn reached(&self, limit: &Position) -> bool {
        self.steps >= limit.steps || self.time >= limit.time
    }

    /// component-wise minimum
    pub fn min(&self, other: &Position) -> Position {
        Position {
            steps: self.steps.min(other.steps),
            time: self.time.min(other.time),
        }
    }

    /// component-wise saturating difference
    pub fn saturating_sub(&self, other: &Position) -> Position {
        Position {
            steps: self.steps.saturating_sub(other.steps),
            time: (self.time - other.time).max(0.0),
        }
    }
}

/// per-point bookkeeping of one improvement run
#[derive(Debug, Clone)]
struct PointInformation {
    /// learned weight, bumped while the point stays uncovered
    weight: Weight,
    /// number of selected subsets covering the point
    subsets_covering_in_solution: usize,
}

impl Default for PointInformation {
    fn default() -> Self {
        Self {
            weight: 1,
            subsets_covering_in_solution: 0,
        }
    }
}

/// per-subset bookkeeping of one improvement run
#[derive(Debug, Clone)]
struct SubsetInformation {
    /// weighted objective change induced by toggling the subset
    score: i64,
    /// last step at which the subset was added or removed
    timestamp: i64,
    /// freshness hint: cleared on removal, set when a neighbor changes state
    can_add_to_solution: bool,
}

impl Default for SubsetInformation {
    fn default() -> Self {
        Self {
            score: 0,
            timestamp: 0,
            can_add_to_solution: true,
        }
    }
}

/** Subset adjacency (non-empty coverage intersection), behind one
interface: adjacency lists by default, per-subset bitsets with the
`dense-neighbors` feature. */
#[derive(Debug)]
enum SubsetNeighbors {
    /// not built yet
    Empty,
    /// neighbors as adjacency lists
    Lists(Vec<Vec<usize>>),
    /// neighbors as per-subset bitsets
    Bitsets(Vec<Bitset>),
}

impl SubsetNeighbors {
    fn for_each_neighbor<F: FnMut(usize)>(&self, i_subset: usize, mut visitor: F) {
        match self {
            SubsetNeighbors::Empty => panic!("subset neighbors used before initialization"),
            SubsetNeighbors::Lists(lists) => {
                for &i_neighbor in &lists[i_subset] {
                    visitor(i_neighbor);
                }
            }
            SubsetNeighbors::Bitsets(bitsets) => {
                bitsets[i_subset].iterate_bits_on(|i_neighbor| {
                    visitor(i_neighbor);
                    true
                });
            }
        }
    }
}

/// state owned by one improvement run
#[derive(Debug)]
struct ResolutionData {
    best_solution: Solution,
    current_solution: Solution,
    /// points with no selected subset covering them
    uncovered_points: Bitset,
    points_information: Vec<PointInformation>,
    subsets_information: Vec<SubsetInformation>,
    /// FIFO of recently added subsets, discouraged from moving again
    tabu_subsets: VecDeque<usize>,
}

impl ResolutionData {
    fn new(solution: &Solution) -> Self {
        let instance = solution.instance();
        Self {
            best_solution: solution.clone(),
            current_solution: solution.clone(),
            uncovered_points: Bitset::new(instance.points_number()),
            points_information: vec![PointInformation::default(); instance.points_number()],
            subsets_information: vec![SubsetInformation::default(); instance.subsets_number()],
            tabu_subsets: VecDeque::with_capacity(TABU_LIST_LENGTH + 1),
        }
    }
}

/// found-at position plus the budget actually consumed by the run
#[derive(Debug, Clone, Copy)]
pub struct Improvement {
    /// step and second at which the final best solution was recorded
    pub found_at: Position,
    /// steps executed and seconds elapsed by the whole run
    pub consumed: Position,
}

/// score of one subset, from its definition (not the incremental state)
fn subset_score(
    subsets_points: &[Bitset],
    selected_subsets: &Bitset,
    points_information: &[PointInformation],
    i_subset: usize,
) -> i64 {
    let mut score = 0;
    if selected_subsets.test(i_subset) {
        // in solution: loss of removing it, counted on the points it alone covers
        subsets_points[i_subset].iterate_bits_on(|i_point| {
            if points_information[i_point].subsets_covering_in_solution == 1 {
                score -= points_information[i_point].weight;
            }
            true
        });
        debug_assert!(score <= 0);
    } else {
        // out of solution: gain of adding it, counted on the uncovered points
        subsets_points[i_subset].iterate_bits_on(|i_point| {
            if points_information[i_point].subsets_covering_in_solution == 0 {
                score += points_information[i_point].weight;
            }
            true
        });
        debug_assert!(score >= 0);
    }
    score
}

/** Row Weighting Local Search engine over one instance.

Precomputes the subset neighbor graph and the point to covering-subsets
index once, then improves covering solutions by repeated remove/repair
steps under a weighted score that it maintains incrementally. One engine
can run any number of improvements over its instance. */
#[derive(Debug)]
pub struct Rwls {
    instance: Rc<Instance>,
    subsets_neighbors: SubsetNeighbors,
    /// subsets_covering_points[p]: bitset of the subsets covering point p
    subsets_covering_points: Vec<Bitset>,
    initialized: bool,
}

impl Rwls {
    /// creates an engine over `instance`; precomputations are deferred
    pub fn new(instance: Rc<Instance>) -> Self {
        Self {
            instance,
            subsets_neighbors: SubsetNeighbors::Empty,
            subsets_covering_points: Vec::new(),
            initialized: false,
        }
    }

    /// instance the engine works on
    pub fn instance(&self) -> &Rc<Instance> {
        &self.instance
    }

    /// builds the neighbor graph and the covering index; idempotent
    pub fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        self.generate_subsets_neighbors();
        self.generate_subsets_covering_points();
        self.initialized = true;
    }

    fn generate_subsets_neighbors(&mut self) {
        info!("({}) Start building subsets neighbors", self.instance.name());
        let timer = Instant::now();
        let subsets_points = self.instance.subsets_points();
        let subsets_number = self.instance.subsets_number();
        // rows are independent: each task writes its own destination cell
        let lists: Vec<Vec<usize>> = (0..subsets_number)
            .into_par_iter()
            .map(|i_subset| {
                (0..subsets_number)
                    .filter(|&i_other| {
                        i_other != i_subset
                            && subsets_points[i_subset].intersects(&subsets_points[i_other])
                    })
                    .collect()
            })
            .collect();
        self.subsets_neighbors = if cfg!(feature = "dense-neighbors") {
            let mut bitsets = vec![Bitset::new(subsets_number); subsets_number];
            for (i_subset, list) in lists.iter().enumerate() {
                for &i_neighbor in list {
                    bitsets[i_subset].set(i_neighbor);
                }
            }
            SubsetNeighbors::Bitsets(bitsets)
        } else {
            SubsetNeighbors::Lists(lists)
        };
        info!(
            "({}) Built subsets neighbors in {}s",
            self.instance.name(),
            timer.elapsed().as_secs_f64()
        );
    }

    fn generate_subsets_covering_points(&mut self) {
        // serial: several subsets write into the same per-point bitset
        self.subsets_covering_points =
            vec![Bitset::new(self.instance.subsets_number()); self.instance.points_number()];
        for i_subset in 0..self.instance.subsets_number() {
            self.instance.subset_points(i_subset).iterate_bits_on(|i_point| {
                self.subsets_covering_points[i_point].set(i_subset);
                true
            });
        }
    }

    fn compute_subset_score(&self, data: &ResolutionData, i_subset: usize) -> i64 {
        subset_score(
            self.instance.subsets_points(),
            &data.current_solution.selected_subsets,
            &data.points_information,
            i_subset,
        )
    }

    /// fills the per-point and per-subset state from the initial solution and seed weights
    fn init(&self, data: &mut ResolutionData, weights: &[Weight]) {
        assert_eq!(weights.len(), self.instance.points_number());

        // per-point cover multiplicities, independent per point
        let covering = &self.subsets_covering_points;
        let selected = &data.current_solution.selected_subsets;
        let multiplicities: Vec<usize> = (0..self.instance.points_number())
            .into_par_iter()
            .map(|i_point| covering[i_point].intersection_count(selected))
            .collect();
        for (i_point, &multiplicity) in multiplicities.iter().enumerate() {
            data.points_information[i_point].subsets_covering_in_solution = multiplicity;
            data.points_information[i_point].weight = weights[i_point];
            if multiplicity == 0 {
                data.uncovered_points.set(i_point);
            }
        }

        // per-subset scores, independent per subset
        let subsets_points = self.instance.subsets_points();
        let points_information = &data.points_information;
        let scores: Vec<i64> = (0..self.instance.subsets_number())
            .into_par_iter()
            .map(|i_subset| {
                subset_score(subsets_points, selected, points_information, i_subset)
            })
            .collect();
        for (i_subset, &score) in scores.iter().enumerate() {
            data.subsets_information[i_subset].score = score;
        }
    }

    fn add_subset(&self, data: &mut ResolutionData, i_subset: usize) {
        debug_assert!(!data.current_solution.selected_subsets.test(i_subset));
        debug_assert!(data.subsets_information[i_subset].score >= 0);

        // update points information
        let points_number = self.instance.points_number();
        let mut points_newly_covered = Bitset::new(points_number);
        let mut points_now_covered_twice = Bitset::new(points_number);
        self.instance.subset_points(i_subset).iterate_bits_on(|i_point| {
            debug_assert_eq!(
                data.points_information[i_point].subsets_covering_in_solution,
                self.subsets_covering_points[i_point]
                    .intersection_count(&data.current_solution.selected_subsets)
            );
            let information = &mut data.points_information[i_point];
            information.subsets_covering_in_solution += 1;
            if information.subsets_covering_in_solution == 1 {
                points_newly_covered.set(i_point);
            } else if information.subsets_covering_in_solution == 2 {
                points_now_covered_twice.set(i_point);
            }
            true
        });

        // add subset to solution
        data.current_solution.selected_subsets.set(i_subset);
        data.uncovered_points.difference_with(self.instance.subset_points(i_subset));

        // toggling side: the gain becomes the loss
        data.subsets_information[i_subset].score = -data.subsets_information[i_subset].score;

        // update neighbors
        let mut tmp = Bitset::new(points_number);
        self.subsets_neighbors.for_each_neighbor(i_subset, |i_neighbor| {
            data.subsets_information[i_neighbor].can_add_to_solution = true;
            if data.current_solution.selected_subsets.test(i_neighbor) {
                // no longer the only subset covering these points
                tmp.copy_from(&points_now_covered_twice);
                tmp.intersect_with(self.instance.subset_points(i_neighbor));
                tmp.iterate_bits_on(|i_point| {
                    data.subsets_information[i_neighbor].score +=
                        data.points_information[i_point].weight;
                    true
                });
            } else {
                // these points are now covered in the solution
                tmp.copy_from(&points_newly_covered);
                tmp.intersect_with(self.instance.subset_points(i_neighbor));
                tmp.iterate_bits_on(|i_point| {
                    data.subsets_information[i_neighbor].score -=
                        data.points_information[i_point].weight;
                    true
                });
            }
        });
    }

    fn remove_subset(&self, data: &mut ResolutionData, i_subset: usize) {
        debug_assert!(data.current_solution.selected_subsets.test(i_subset));
        debug_assert!(data.subsets_information[i_subset].score <= 0);

        // update points information
        let points_number = self.instance.points_number();
        let mut points_newly_uncovered = Bitset::new(points_number);
        let mut points_now_covered_once = Bitset::new(points_number);
        self.instance.subset_points(i_subset).iterate_bits_on(|i_point| {
            debug_assert!(data.points_information[i_point].subsets_covering_in_solution > 0);
            debug_assert_eq!(
                data.points_information[i_point].subsets_covering_in_solution,
                self.subsets_covering_points[i_point]
                    .intersection_count(&data.current_solution.selected_subsets)
            );
            let information = &mut data.points_information[i_point];
            information.subsets_covering_in_solution -= 1;
            if information.subsets_covering_in_solution == 0 {
                points_newly_uncovered.set(i_point);
            } else if information.subsets_covering_in_solution == 1 {
                points_now_covered_once.set(i_point);
            }
            true
        });

        // remove subset from solution
        data.current_solution.selected_subsets.reset(i_subset);
        debug_assert!(data.uncovered_points.is_disjoint(&points_newly_uncovered));
        data.uncovered_points.union_with(&points_newly_uncovered);

        // toggling side: the loss becomes the gain
        data.subsets_information[i_subset].score = -data.subsets_information[i_subset].score;
        data.subsets_information[i_subset].can_add_to_solution = false;

        // update neighbors
        let mut tmp = Bitset::new(points_number);
        self.subsets_neighbors.for_each_neighbor(i_subset, |i_neighbor| {
            data.subsets_information[i_neighbor].can_add_to_solution = true;
            if data.current_solution.selected_subsets.test(i_neighbor) {
                // now the only subset covering these points
                tmp.copy_from(&points_now_covered_once);
                tmp.intersect_with(self.instance.subset_points(i_neighbor));
                tmp.iterate_bits_on(|i_point| {
                    data.subsets_information[i_neighbor].score -=
                        data.points_information[i_point].weight;
                    true
                });
            } else {
                // these points are now uncovered in the solution
                tmp.copy_from(&points_newly_uncovered);
                tmp.intersect_with(self.instance.subset_points(i_neighbor));
                tmp.iterate_bits_on(|i_point| {
                    data.subsets_information[i_neighbor].score +=
                        data.points_information[i_point].weight;
                    true
                });
            }
        });
    }

    fn make_tabu(data: &mut ResolutionData, i_subset: usize) {
        data.tabu_subsets.push_back(i_subset);
        if data.tabu_subsets.len() > TABU_LIST_LENGTH {
            data.tabu_subsets.pop_front();
        }
    }

    fn is_tabu(data: &ResolutionData, i_subset: usize) -> bool {
        data.tabu_subsets.contains(&i_subset)
    }

    /// selected subset with the maximum score, first in bit order on ties
    fn select_subset_to_remove_no_timestamp(data: &ResolutionData) -> usize {
        let mut selected_subset = data
            .current_solution
            .selected_subsets
            .find_first()
            .expect("tried to select a subset to remove from an empty solution");
        let mut best_score = data.subsets_information[selected_subset].score;
        data.current_solution.selected_subsets.iterate_bits_on(|i_subset| {
            if data.subsets_information[i_subset].score > best_score {
                best_score = data.subsets_information[i_subset].score;
                selected_subset = i_subset;
            }
            true
        });
        selected_subset
    }

    /// selected non-tabu subset maximizing (score, -timestamp); the first
    /// selected subset stands in when everything else is tabu or worse
    fn select_subset_to_remove(data: &ResolutionData) -> usize {
        let mut remove_subset = data
            .current_solution
            .selected_subsets
            .find_first()
            .expect("tried to select a subset to remove from an empty solution");
        let mut best_score_timestamp = (
            data.subsets_information[remove_subset].score,
            -data.subsets_information[remove_subset].timestamp,
        );
        data.current_solution.selected_subsets.iterate_bits_on(|i_subset| {
            let current_score_timestamp = (
                data.subsets_information[i_subset].score,
                -data.subsets_information[i_subset].timestamp,
            );
            if current_score_timestamp > best_score_timestamp && !Self::is_tabu(data, i_subset) {
                best_score_timestamp = current_score_timestamp;
                remove_subset = i_subset;
            }
            true
        });
        remove_subset
    }

    /** Among the unselected subsets covering `point_to_cover`, selects the
    one maximizing (score, -timestamp). The `can_add_to_solution` hint skips
    stale candidates; a tabu incumbent is replaced by the next fresh
    candidate so tabu subsets are only chosen as a last resort. */
    fn select_subset_to_add(&self, data: &ResolutionData, point_to_cover: usize) -> usize {
        debug_assert!(data.uncovered_points.test(point_to_cover));

        let mut candidates = self.subsets_covering_points[point_to_cover].clone();
        candidates.difference_with(&data.current_solution.selected_subsets);
        let mut add_subset = candidates
            .find_first()
            .unwrap_or_else(|| panic!(
                "({}) no unselected subset covers point {}",
                self.instance.name(),
                point_to_cover
            ));
        let mut add_subset_is_tabu = Self::is_tabu(data, add_subset);
        let mut best_score_timestamp = (
            data.subsets_information[add_subset].score,
            -data.subsets_information[add_subset].timestamp,
        );
        candidates.iterate_bits_on(|i_subset| {
            if !data.subsets_information[i_subset].can_add_to_solution {
                return true;
            }
            let current_score_timestamp = (
                data.subsets_information[i_subset].score,
                -data.subsets_information[i_subset].timestamp,
            );
            if add_subset_is_tabu {
                // anything beats a tabu incumbent
                best_score_timestamp = current_score_timestamp;
                add_subset = i_subset;
                add_subset_is_tabu = Self::is_tabu(data, add_subset);
                return true;
            }
            if current_score_timestamp > best_score_timestamp && !Self::is_tabu(data, i_subset) {
                best_score_timestamp = current_score_timestamp;
                add_subset = i_subset;
            }
            true
        });

        if Self::is_tabu(data, add_subset) {
            warn!("({}) Selected subset is tabu", self.instance.name());
        }
        debug_assert!(!data.current_solution.selected_subsets.test(add_subset));
        add_subset
    }

    /** Draws an uncovered point. The draw is taken in `0..=count` inclusive
    against a 1-based running counter, reproducing the slight bias toward
    the last set bit of the historical implementation; build with the
    `unbiased-point-draw` feature for a strictly uniform draw. */
    #[cfg(not(feature = "unbiased-point-draw"))]
    fn select_uncovered_point(data: &ResolutionData, rng: &mut Rng) -> usize {
        debug_assert!(data.uncovered_points.any());
        let mut selected_point = 0;
        let selected_point_number = rng.usize(0..=data.uncovered_points.count());
        let mut current_point_number = 0;
        data.uncovered_points.iterate_bits_on(|i_point| {
            current_point_number += 1;
            if current_point_number >= selected_point_number {
                selected_point = i_point;
                return false;
            }
            true
        });
        debug_assert!(data.uncovered_points.test(selected_point));
        selected_point
    }

    /// draws an uncovered point uniformly
    #[cfg(feature = "unbiased-point-draw")]
    fn select_uncovered_point(data: &ResolutionData, rng: &mut Rng) -> usize {
        debug_assert!(data.uncovered_points.any());
        let mut selected_point = 0;
        let selected_point_number = rng.usize(0..data.uncovered_points.count());
        let mut current_point_number = 0;
        data.uncovered_points.iterate_bits_on(|i_point| {
            if current_point_number == selected_point_number {
                selected_point = i_point;
                return false;
            }
            current_point_number += 1;
            true
        });
        debug_assert!(data.uncovered_points.test(selected_point));
        selected_point
    }

    /// improves `solution` in place with unit starting weights
    pub fn improve(
        &mut self,
        solution: &mut Solution,
        rng: &mut Rng,
        stopping_criterion: Position,
    ) -> Position {
        let mut weights = vec![1; self.instance.points_number()];
        self.improve_seeded(solution, rng, stopping_criterion, &mut weights)
            .found_at
    }

    /** Improves `solution` in place, starting from the given point weights.
    On return `weights` holds the weights learned by the run and the result
    carries both the found-at position of the best solution and the budget
    actually consumed (used by the memetic driver for cumulative budgets).

    The same (solution, seed, budget) always yields the same best solution
    and found-at position. */
    pub fn improve_seeded(
        &mut self,
        solution: &mut Solution,
        rng: &mut Rng,
        stopping_criterion: Position,
        weights: &mut [Weight],
    ) -> Improvement {
        if !self.initialized {
            self.initialize();
        }

        info!(
            "({}) Start optimising by RWLS solution with {} subsets",
            self.instance.name(),
            solution.selected_subsets.count()
        );
        let init_timer = Instant::now();
        let mut data = ResolutionData::new(solution);
        self.init(&mut data, weights);
        debug!(
            "({}) RWLS inited in {}s",
            self.instance.name(),
            init_timer.elapsed().as_secs_f64()
        );

        let timer = Instant::now();
        let mut step: usize = 0;
        let mut found_at = Position::zero();
        while step < stopping_criterion.steps
            && timer.elapsed().as_secs_f64() < stopping_criterion.time
        {
            while data.uncovered_points.none() {
                data.current_solution.compute_cover();
                assert!(
                    data.current_solution.cover_all_points,
                    "({}) new best solution doesn't cover all points",
                    self.instance.name()
                );

                data.best_solution = data.current_solution.clone();
                found_at.steps = step;
                found_at.time = timer.elapsed().as_secs_f64();
                debug!(
                    "({}) RWLS new best solution with {} subsets at step {} in {}s",
                    self.instance.name(),
                    data.best_solution.selected_subsets.count(),
                    step,
                    found_at.time
                );

                let selected_subset = Self::select_subset_to_remove_no_timestamp(&data);
                self.remove_subset(&mut data, selected_subset);
            }

            // remove subset
            let subset_to_remove = Self::select_subset_to_remove(&data);
            self.remove_subset(&mut data, subset_to_remove);
            data.subsets_information[subset_to_remove].timestamp = step as i64;

            // add subset
            let selected_point = Self::select_uncovered_point(&data, rng);
            let subset_to_add = self.select_subset_to_add(&data, selected_point);
            self.add_subset(&mut data, subset_to_add);
            data.subsets_information[subset_to_add].timestamp = step as i64;
            Self::make_tabu(&mut data, subset_to_add);

            // points still uncovered get heavier, and so do the subsets able to cover them
            data.uncovered_points.iterate_bits_on(|i_point| {
                debug_assert_eq!(
                    data.points_information[i_point].subsets_covering_in_solution,
                    0
                );
                data.points_information[i_point].weight += 1;
                self.subsets_covering_points[i_point].iterate_bits_on(|i_covering| {
                    data.subsets_information[i_covering].score += 1;
                    true
                });
                true
            });

            step += 1;
        }

        info!(
            "({}) Optimised RWLS solution to {} subsets in {} steps {}s",
            self.instance.name(),
            data.best_solution.selected_subsets.count(),
            step,
            timer.elapsed().as_secs_f64()
        );

        *solution = data.best_solution;
        for (weight, information) in weights.iter_mut().zip(&data.points_information) {
            *weight = information.weight;
        }
        Improvement {
            found_at,
            consumed: Position {
                steps: step,
                time: timer.elapsed().as_secs_f64(),
            },
        }
    }

    /// full bookkeeping check against the definitions, for tests
    #[cfg(test)]
    fn check_invariants(&self, data: &ResolutionData) {
        for i_point in 0..self.instance.points_number() {
            let multiplicity = self.subsets_covering_points[i_point]
                .intersection_count(&data.current_solution.selected_subsets);
            assert_eq!(
                data.points_information[i_point].subsets_covering_in_solution,
                multiplicity
            );
            assert_eq!(data.uncovered_points.test(i_point), multiplicity == 0);
        }
        for i_subset in 0..self.instance.subsets_number() {
            assert_eq!(
                data.subsets_information[i_subset].score,
                self.compute_subset_score(data, i_subset)
            );
        }
    }
}

/// improves a covering solution with a fresh engine
pub fn improve(
    solution_initial: &Solution,
    rng: &mut Rng,
    stopping_criterion: Position,
) -> Solution {
    let mut rwls = Rwls::new(Rc::clone(solution_initial.instance()));
    rwls.initialize();
    let mut solution_final = solution_initial.clone();
    rwls.improve(&mut solution_final, rng, stopping_criterion);
    solution_final
}

/// improves a covering solution with a fresh engine, with the full report
pub fn improve_report(
    solution_initial: &Solution,
    rng: &mut Rng,
    stopping_criterion: Position,
) -> RwlsReport {
    let mut rwls = Rwls::new(Rc::clone(solution_initial.instance()));
    rwls.initialize();
    let mut report = RwlsReport::new(Rc::clone(solution_initial.instance()));
    report.solution_initial = solution_initial.clone();
    report.solution_final = solution_initial.clone();
    report.found_at = rwls.improve(&mut report.solution_final, rng, stopping_criterion);
    report
}

/// RWLS improvement report
#[derive(Debug, Clone)]
pub struct RwlsReport {
    /// covering solution the run started from
    pub solution_initial: Solution,
    /// best solution found
    pub solution_final: Solution,
    /// step and second at which the best solution was found
    pub found_at: Position,
}

impl RwlsReport {
    /// empty report over `instance`
    pub fn new(instance: Rc<Instance>) -> Self {
        Self {
            solution_initial: Solution::new(Rc::clone(&instance)),
            solution_final: Solution::new(instance),
            found_at: Position::zero(),
        }
    }

    /// snapshot for the serialization boundary
    pub fn serialize(&self) -> RwlsReportSerial {
        debug_assert_eq!(
            self.solution_initial.instance().name(),
            self.solution_final.instance().name()
        );
        RwlsReportSerial {
            solution_initial: self.solution_initial.serialize(),
            solution_final: self.solution_final.serialize(),
            steps: self.found_at.steps,
            time: self.found_at.time,
        }
    }

    /// restores a report from a snapshot, false when either solution does not load
    pub fn load(&mut self, serial: &RwlsReportSerial) -> bool {
        if !self.solution_initial.load(&serial.solution_initial) {
            warn!("Failed to load initial solution");
            return false;
        }
        if !self.solution_final.load(&serial.solution_final) {
            warn!("Failed to load final solution");
            return false;
        }
        self.found_at.steps = serial.steps;
        self.found_at.time = serial.time;
        true
    }
}

/// serializable RWLS report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RwlsReportSerial {
    /// initial solution snapshot
    pub solution_initial: SolutionSerial,
    /// final solution snapshot
    pub solution_final: SolutionSerial,
    /// step at which the best solution was found
    pub steps: usize,
    /// second at which the best solution was found
    pub time: f64,
}

/// expands a report computed on a reduced instance to its parent instance
pub fn expand(reduced_report: &RwlsReport) -> Result<RwlsReport> {
    let solution_initial = solution::expand(&reduced_report.solution_initial)?;
    let solution_final = solution::expand(&reduced_report.solution_final)?;
    Ok(RwlsReport {
        solution_initial,
        solution_final,
        found_at: reduced_report.found_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::greedy;
    use crate::instance::{self, tests::instance_from_lists};

    /// STS(9): 12 triples over 9 points, optimum cover of 5 subsets
    fn sts9() -> Rc<Instance> {
        Rc::new(instance_from_lists(
            "sts9",
            9,
            &[
                &[0, 1, 2],
                &[3, 4, 5],
                &[6, 7, 8],
                &[0, 3, 6],
                &[1, 4, 7],
                &[2, 5, 8],
                &[0, 4, 8],
                &[1, 5, 6],
                &[2, 3, 7],
                &[0, 5, 7],
                &[1, 3, 8],
                &[2, 4, 6],
            ],
        ))
    }

    #[test]
    fn test_bookkeeping_add_remove() {
        let instance = sts9();
        let mut rwls = Rwls::new(Rc::clone(&instance));
        rwls.initialize();

        let mut solution = greedy::solve(&instance).unwrap();
        let mut data = ResolutionData::new(&solution);
        let weights = vec![1; instance.points_number()];
        rwls.init(&mut data, &weights);
        rwls.check_invariants(&data);

        // removing any selected subset keeps every incremental quantity exact
        let removed = data.current_solution.selected_subsets.find_first().unwrap();
        rwls.remove_subset(&mut data, removed);
        rwls.check_invariants(&data);

        // adding it back restores a consistent covering state
        assert!(data.subsets_information[removed].score >= 0);
        rwls.add_subset(&mut data, removed);
        rwls.check_invariants(&data);
        assert!(data.uncovered_points.none());

        solution.compute_cover();
        assert!(solution.cover_all_points);
    }

    #[test]
    fn test_weight_bump_keeps_scores_consistent() {
        let instance = sts9();
        let mut rwls = Rwls::new(Rc::clone(&instance));
        rwls.initialize();

        let solution = greedy::solve(&instance).unwrap();
        let mut data = ResolutionData::new(&solution);
        let weights = vec![1; instance.points_number()];
        rwls.init(&mut data, &weights);

        // force uncovered points, then replay the weight update of the main loop
        let removed = Rwls::select_subset_to_remove_no_timestamp(&data);
        rwls.remove_subset(&mut data, removed);
        data.uncovered_points.clone().iterate_bits_on(|i_point| {
            data.points_information[i_point].weight += 1;
            rwls.subsets_covering_points[i_point].iterate_bits_on(|i_covering| {
                data.subsets_information[i_covering].score += 1;
                true
            });
            true
        });
        rwls.check_invariants(&data);
    }

    #[test]
    fn test_improves_overshooting_greedy() {
        // the large subset baits the greedy into a three-subset cover,
        // the two disjoint triples cover everything by themselves
        let instance = Rc::new(instance_from_lists(
            "greedy_trap",
            6,
            &[&[0, 1, 3, 4], &[0, 1, 2], &[3, 4, 5]],
        ));
        let greedy_solution = greedy::solve(&instance).unwrap();
        assert_eq!(greedy_solution.selected_subsets.count(), 3);

        let mut rng = Rng::with_seed(1);
        let report = improve_report(
            &greedy_solution,
            &mut rng,
            Position {
                steps: 10_000,
                time: f64::MAX,
            },
        );
        assert!(report.solution_final.cover_all_points);
        assert_eq!(report.solution_final.selected_subsets.count(), 2);
        assert_eq!(
            report.solution_final.selected_subsets.ones().collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn test_determinism() {
        let instance = sts9();
        let greedy_solution = greedy::solve(&instance).unwrap();
        let budget = Position {
            steps: 2_000,
            time: f64::MAX,
        };
        let first = improve_report(&greedy_solution, &mut Rng::with_seed(7), budget);
        let second = improve_report(&greedy_solution, &mut Rng::with_seed(7), budget);
        assert_eq!(
            first.solution_final.selected_subsets,
            second.solution_final.selected_subsets
        );
        assert_eq!(first.found_at.steps, second.found_at.steps);
    }

    #[test]
    fn test_best_never_worse_than_initial() {
        let mut rng = Rng::with_seed(3);
        let instance = Rc::new(instance::generate("random", 60, 30, &mut rng, 2, 6));
        let greedy_solution = greedy::solve(&instance).unwrap();
        let report = improve_report(
            &greedy_solution,
            &mut rng,
            Position {
                steps: 5_000,
                time: f64::MAX,
            },
        );
        assert!(report.solution_final.cover_all_points);
        assert!(
            report.solution_final.selected_subsets.count()
                <= greedy_solution.selected_subsets.count()
        );
    }

    #[test]
    fn test_seeded_weights_in_out() {
        let instance = sts9();
        let mut rwls = Rwls::new(Rc::clone(&instance));
        let mut solution = greedy::solve(&instance).unwrap();
        let mut rng = Rng::with_seed(11);
        let mut weights = vec![2; instance.points_number()];
        let improvement = rwls.improve_seeded(
            &mut solution,
            &mut rng,
            Position {
                steps: 500,
                time: f64::MAX,
            },
            &mut weights,
        );
        assert!(solution.cover_all_points);
        assert_eq!(improvement.consumed.steps, 500);
        assert!(improvement.found_at.steps <= improvement.consumed.steps);
        // stubborn points got heavier, nothing got lighter
        assert!(weights.iter().all(|&weight| weight >= 2));
    }

    #[test]
    fn test_zero_budget_returns_initial() {
        let instance = sts9();
        let greedy_solution = greedy::solve(&instance).unwrap();
        let mut rng = Rng::with_seed(5);
        let solution = improve(
            &greedy_solution,
            &mut rng,
            Position {
                steps: 0,
                time: f64::MAX,
            },
        );
        assert_eq!(solution.selected_subsets, greedy_solution.selected_subsets);
    }

    #[test]
    fn test_report_roundtrip() {
        let instance = sts9();
        let greedy_solution = greedy::solve(&instance).unwrap();
        let mut rng = Rng::with_seed(13);
        let report = improve_report(
            &greedy_solution,
            &mut rng,
            Position {
                steps: 1_000,
                time: f64::MAX,
            },
        );
        let serial = report.serialize();
        let json = serde_json::to_string(&serial).unwrap();
        let parsed: RwlsReportSerial = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, serial);
        let mut loaded = RwlsReport::new(Rc::clone(&instance));
        assert!(loaded.load(&parsed));
        assert_eq!(loaded.serialize(), serial);
    }

    #[test]
    fn test_position_arithmetic() {
        let budget = Position {
            steps: 100,
            time: 10.0,
        };
        let spent = Position {
            steps: 40,
            time: 12.0,
        };
        assert!(spent.reached(&budget));
        let remaining = budget.saturating_sub(&spent);
        assert_eq!(remaining.steps, 60);
        assert_eq!(remaining.time, 0.0);
        let per_call = Position {
            steps: 50,
            time: 1.0,
        }
        .min(&remaining);
        assert_eq!(per_call.steps, 50);
        assert_eq!(per_call.time, 0.0);
    }
}
