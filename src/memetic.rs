use std::rc::Rc;
use std::time::Instant;

use fastrand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::crossover::{self, Crossover};
use crate::error::{Error, Result};
use crate::greedy;
use crate::instance::Instance;
use crate::rwls::{Position, Rwls, Weight};
use crate::solution::{self, Solution, SolutionSerial};
use crate::wcrossover::{self, WeightCrossover};

/// number of weighted solutions kept in the population
pub const POPULATION_SIZE: usize = 10;

/** Position of the memetic search: generation count, cumulative RWLS
budget consumed by all improvement calls, and wall-clock seconds. Used both
as a stopping criterion and to report where the best solution was found. */
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemeticPosition {
    /// generation number
    pub generation: usize,
    /// RWLS budget consumed across every improvement call
    pub rwls_cumulative_position: Position,
    /// seconds
    pub time: f64,
}

impl MemeticPosition {
    /// position zero
    pub fn zero() -> Self {
        Self {
            generation: 0,
            rwls_cumulative_position: Position::zero(),
            time: 0.0,
        }
    }

    /// criterion that never stops the search
    pub fn unlimited() -> Self {
        Self {
            generation: usize::MAX,
            rwls_cumulative_position: Position::unlimited(),
            time: f64::MAX,
        }
    }

    /// true iff any component reached `limit`
    pub fn reached(&self, limit: &MemeticPosition) -> bool {
        self.generation >= limit.generation
            || self.rwls_cumulative_position.reached(&limit.rwls_cumulative_position)
            || self.time >= limit.time
    }
}

/// memetic solving configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemeticConfig {
    /// when to stop the generational loop
    pub stopping_criterion: MemeticPosition,
    /// per-improvement-call RWLS budget, capped by the remaining cumulative budget
    pub rwls_stopping_criterion: Position,
}

/** Memetic driver: evolves a population of weighted solutions, breeding
two children per generation through the configured crossover and seeding
each child's RWLS run with the weight crossover of its parents. */
#[derive(Debug)]
pub struct Memetic {
    instance: Rc<Instance>,
    rwls: Rwls,
    crossover: Box<dyn Crossover>,
    wcrossover: Box<dyn WeightCrossover>,
}

impl Memetic {
    /// creates a driver with already-resolved operators
    pub fn new(
        instance: Rc<Instance>,
        crossover: Box<dyn Crossover>,
        wcrossover: Box<dyn WeightCrossover>,
    ) -> Self {
        let rwls = Rwls::new(Rc::clone(&instance));
        Self {
            instance,
            rwls,
            crossover,
            wcrossover,
        }
    }

    /// precomputes the RWLS structures; idempotent, also done lazily
    pub fn initialize(&mut self) {
        self.rwls.initialize();
    }

    /** Runs the memetic search. The population starts from random greedy
    individuals carrying unit weights; every generation two parents breed
    two children ((a, b) with `apply1` weights and (b, a) with `apply2`
    weights), each child is improved by RWLS under the per-call budget
    capped by what remains of the cumulative budget, and replaces the worst
    individual. Stops when the configured generation count, cumulative RWLS
    budget or wall-clock limit is reached. */
    pub fn solve(&mut self, rng: &mut Rng, config: &MemeticConfig) -> Result<MemeticReport> {
        info!(
            "({}) Start solving by memetic with {} crossover and {} weights crossover",
            self.instance.name(),
            self.crossover.name(),
            self.wcrossover.name()
        );
        let timer = Instant::now();

        let points_number = self.instance.points_number();
        let mut population: Vec<(Solution, Vec<Weight>)> = Vec::with_capacity(POPULATION_SIZE);
        for _ in 0..POPULATION_SIZE {
            let individual = greedy::random_solve(&self.instance, rng)?;
            population.push((individual, vec![1; points_number]));
        }

        let mut best_solution = population
            .iter()
            .map(|(individual, _)| individual)
            .min_by_key(|individual| individual.selected_subsets.count())
            .expect("population is never empty")
            .clone();
        let mut cumulative = Position::zero();
        let mut found_at = MemeticPosition {
            generation: 0,
            rwls_cumulative_position: cumulative,
            time: timer.elapsed().as_secs_f64(),
        };

        let mut generation: usize = 0;
        'generations: loop {
            let current = MemeticPosition {
                generation,
                rwls_cumulative_position: cumulative,
                time: timer.elapsed().as_secs_f64(),
            };
            if current.reached(&config.stopping_criterion) {
                break;
            }

            // two distinct parents, uniformly
            let first_parent = rng.usize(0..POPULATION_SIZE);
            let mut second_parent = rng.usize(0..POPULATION_SIZE);
            while second_parent == first_parent {
                second_parent = rng.usize(0..POPULATION_SIZE);
            }

            for reversed in [false, true] {
                let now = MemeticPosition {
                    generation,
                    rwls_cumulative_position: cumulative,
                    time: timer.elapsed().as_secs_f64(),
                };
                if now.reached(&config.stopping_criterion) {
                    break 'generations;
                }

                let (parent_a, parent_b) = if reversed {
                    (&population[second_parent], &population[first_parent])
                } else {
                    (&population[first_parent], &population[second_parent])
                };
                let mut child = self.crossover.apply(&parent_a.0, &parent_b.0, rng);
                let mut child_weights = if reversed {
                    self.wcrossover
                        .apply2(&population[first_parent].1, &population[second_parent].1, rng)
                } else {
                    self.wcrossover
                        .apply1(&population[first_parent].1, &population[second_parent].1, rng)
                };

                let remaining = config
                    .stopping_criterion
                    .rwls_cumulative_position
                    .saturating_sub(&cumulative);
                let budget = config.rwls_stopping_criterion.min(&remaining);
                let improvement =
                    self.rwls
                        .improve_seeded(&mut child, rng, budget, &mut child_weights);
                cumulative.steps += improvement.consumed.steps;
                cumulative.time += improvement.consumed.time;

                // replace the worst individual, first one on ties
                let mut worst = 0;
                for i_individual in 1..POPULATION_SIZE {
                    if population[i_individual].0.selected_subsets.count()
                        > population[worst].0.selected_subsets.count()
                    {
                        worst = i_individual;
                    }
                }
                if child.selected_subsets.count() < best_solution.selected_subsets.count() {
                    best_solution = child.clone();
                    found_at = MemeticPosition {
                        generation,
                        rwls_cumulative_position: cumulative,
                        time: timer.elapsed().as_secs_f64(),
                    };
                    info!(
                        "({}) Memetic new best solution with {} subsets at generation {}",
                        self.instance.name(),
                        best_solution.selected_subsets.count(),
                        generation
                    );
                }
                population[worst] = (child, child_weights);
            }

            generation += 1;
        }

        info!(
            "({}) Optimised by memetic to {} subsets in {} generations and {}s",
            self.instance.name(),
            best_solution.selected_subsets.count(),
            generation,
            timer.elapsed().as_secs_f64()
        );

        Ok(MemeticReport {
            solution_final: best_solution,
            found_at,
            solve_config: *config,
            crossover_operator: self.crossover.name().to_string(),
        })
    }
}

/** Resolves both operator names and runs the memetic search; an unknown
name is an invalid-input error. */
pub fn solve(
    instance: &Rc<Instance>,
    crossover_name: &str,
    wcrossover_name: &str,
    rng: &mut Rng,
    config: &MemeticConfig,
) -> Result<MemeticReport> {
    let crossover_operator = crossover::by_name(crossover_name, instance).ok_or_else(|| {
        Error::InvalidInput(format!("no crossover operator named \"{}\" exist", crossover_name))
    })?;
    let wcrossover_operator = wcrossover::by_name(wcrossover_name, instance).ok_or_else(|| {
        Error::InvalidInput(format!(
            "no RWLS weights crossover operator named \"{}\" exist",
            wcrossover_name
        ))
    })?;
    let mut memetic = Memetic::new(Rc::clone(instance), crossover_operator, wcrossover_operator);
    memetic.initialize();
    memetic.solve(rng, config)
}

/// memetic solving report
#[derive(Debug, Clone)]
pub struct MemeticReport {
    /// best solution found
    pub solution_final: Solution,
    /// position at which the best solution was found
    pub found_at: MemeticPosition,
    /// configuration the search ran under
    pub solve_config: MemeticConfig,
    /// name of the crossover operator used
    pub crossover_operator: String,
}

impl MemeticReport {
    /// empty report over `instance`
    pub fn new(instance: Rc<Instance>) -> Self {
        Self {
            solution_final: Solution::new(instance),
            found_at: MemeticPosition::zero(),
            solve_config: MemeticConfig {
                stopping_criterion: MemeticPosition::unlimited(),
                rwls_stopping_criterion: Position::unlimited(),
            },
            crossover_operator: String::new(),
        }
    }

    /// snapshot for the serialization boundary
    pub fn serialize(&self) -> MemeticReportSerial {
        MemeticReportSerial {
            solution_final: self.solution_final.serialize(),
            found_at: self.found_at,
            solve_config: self.solve_config,
            crossover_operator: self.crossover_operator.clone(),
        }
    }

    /// restores a report from a snapshot, false when the solution does not load
    pub fn load(&mut self, serial: &MemeticReportSerial) -> bool {
        if !self.solution_final.load(&serial.solution_final) {
            warn!("Failed to load final solution");
            return false;
        }
        self.found_at = serial.found_at;
        self.solve_config = serial.solve_config;
        self.crossover_operator = serial.crossover_operator.clone();
        true
    }
}

/// serializable memetic report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemeticReportSerial {
    /// final solution snapshot
    pub solution_final: SolutionSerial,
    /// position at which the best solution was found
    pub found_at: MemeticPosition,
    /// configuration the search ran under
    pub solve_config: MemeticConfig,
    /// name of the crossover operator used
    pub crossover_operator: String,
}

/// expands a report computed on a reduced instance to its parent instance
pub fn expand(reduced_report: &MemeticReport) -> Result<MemeticReport> {
    let solution_final = solution::expand(&reduced_report.solution_final)?;
    Ok(MemeticReport {
        solution_final,
        found_at: reduced_report.found_at,
        solve_config: reduced_report.solve_config,
        crossover_operator: reduced_report.crossover_operator.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{self, tests::instance_from_lists};

    fn small_config() -> MemeticConfig {
        MemeticConfig {
            stopping_criterion: MemeticPosition {
                generation: 8,
                rwls_cumulative_position: Position {
                    steps: 2_000,
                    time: f64::MAX,
                },
                time: f64::MAX,
            },
            rwls_stopping_criterion: Position {
                steps: 200,
                time: f64::MAX,
            },
        }
    }

    #[test]
    fn test_identity_keep_degenerates_to_repeated_rwls() {
        let instance = Rc::new(instance_from_lists(
            "degenerate",
            6,
            &[&[0, 1, 3, 4], &[0, 1, 2], &[3, 4, 5], &[2, 5]],
        ));
        let mut rng = Rng::with_seed(21);
        let report = solve(&instance, "identity", "keep", &mut rng, &small_config()).unwrap();
        assert!(report.solution_final.cover_all_points);
        // RWLS-improved children can only match or beat the seeds
        assert!(report.solution_final.selected_subsets.count() <= 3);
        assert_eq!(report.crossover_operator, "identity");
    }

    #[test]
    fn test_cumulative_budget_is_respected() {
        let mut rng = Rng::with_seed(2);
        let instance = Rc::new(instance::generate("budget", 40, 20, &mut rng, 2, 5));
        let config = small_config();
        let report = solve(&instance, "merge", "reset", &mut rng, &config).unwrap();
        assert!(
            report.found_at.rwls_cumulative_position.steps
                <= config.stopping_criterion.rwls_cumulative_position.steps
        );
    }

    #[test]
    fn test_unknown_operator_names_are_errors() {
        let instance = Rc::new(instance_from_lists("unknown", 2, &[&[0], &[1]]));
        let mut rng = Rng::with_seed(0);
        assert!(matches!(
            solve(&instance, "nope", "keep", &mut rng, &small_config()),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            solve(&instance, "merge", "nope", &mut rng, &small_config()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_unsolvable_instance_fails_before_search() {
        let instance = Rc::new(instance_from_lists("unsolvable", 3, &[&[0], &[1]]));
        let mut rng = Rng::with_seed(0);
        assert!(matches!(
            solve(&instance, "merge", "reset", &mut rng, &small_config()),
            Err(Error::NoSolution(_))
        ));
    }

    #[test]
    fn test_determinism() {
        let instance = Rc::new(instance_from_lists(
            "deterministic",
            6,
            &[&[0, 1, 3, 4], &[0, 1, 2], &[3, 4, 5], &[2, 5], &[0, 5]],
        ));
        let config = small_config();
        let first = solve(&instance, "subproblem_random", "mix_random", &mut Rng::with_seed(4), &config).unwrap();
        let second = solve(&instance, "subproblem_random", "mix_random", &mut Rng::with_seed(4), &config).unwrap();
        assert_eq!(
            first.solution_final.selected_subsets,
            second.solution_final.selected_subsets
        );
        assert_eq!(first.found_at.generation, second.found_at.generation);
    }

    #[test]
    fn test_report_roundtrip() {
        let instance = Rc::new(instance_from_lists(
            "roundtrip",
            4,
            &[&[0, 1], &[2, 3], &[1, 2]],
        ));
        let mut rng = Rng::with_seed(6);
        let report = solve(&instance, "greedy_merge", "average", &mut rng, &small_config()).unwrap();
        let serial = report.serialize();
        let json = serde_json::to_string(&serial).unwrap();
        let parsed: MemeticReportSerial = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, serial);
        let mut loaded = MemeticReport::new(Rc::clone(&instance));
        assert!(loaded.load(&parsed));
        assert_eq!(loaded.serialize(), serial);
    }
}
