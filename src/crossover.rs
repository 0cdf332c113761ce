use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use fastrand::Rng;

use crate::bitset::Bitset;
use crate::greedy;
use crate::instance::Instance;
use crate::rwls::{Position, Rwls};
use crate::solution::Solution;

/// steps of the RWLS polish run by the `*_rwls` operators
const RWLS_POLISH_STEPS: usize = 1000;

/** A crossover combines two covering parent solutions over the same
instance into a covering child. Operators are pure: the same parents and
rng state always produce the same child. */
pub trait Crossover: fmt::Debug {
    /// stable identifier used for configuration
    fn name(&self) -> &'static str;

    /// builds a child from two parents
    fn apply(&self, a: &Solution, b: &Solution, rng: &mut Rng) -> Solution;
}

/// names accepted by [`by_name`], in registry order
pub const OPERATOR_NAMES: &[&str] = &[
    "identity",
    "merge",
    "greedy_merge",
    "subproblem_random",
    "extended_subproblem_random",
    "subproblem_greedy",
    "extended_subproblem_greedy",
    "subproblem_rwls",
    "extended_subproblem_rwls",
];

/// resolves an operator name, capturing the instance; `None` when unknown
pub fn by_name(name: &str, instance: &Rc<Instance>) -> Option<Box<dyn Crossover>> {
    let instance = Rc::clone(instance);
    match name {
        "identity" => Some(Box::new(Identity { instance })),
        "merge" => Some(Box::new(Merge { instance })),
        "greedy_merge" => Some(Box::new(GreedyMerge { instance })),
        "subproblem_random" => Some(Box::new(Subproblem {
            instance,
            extended: false,
            finisher: Finisher::Random,
        })),
        "extended_subproblem_random" => Some(Box::new(Subproblem {
            instance,
            extended: true,
            finisher: Finisher::Random,
        })),
        "subproblem_greedy" => Some(Box::new(Subproblem {
            instance,
            extended: false,
            finisher: Finisher::Greedy,
        })),
        "extended_subproblem_greedy" => Some(Box::new(Subproblem {
            instance,
            extended: true,
            finisher: Finisher::Greedy,
        })),
        "subproblem_rwls" => Some(Box::new(SubproblemRwls::new(instance, false))),
        "extended_subproblem_rwls" => Some(Box::new(SubproblemRwls::new(instance, true))),
        _ => None,
    }
}

fn check_parents(instance: &Rc<Instance>, a: &Solution, b: &Solution) {
    debug_assert!(Rc::ptr_eq(instance, a.instance()));
    debug_assert!(Rc::ptr_eq(instance, b.instance()));
    debug_assert!(a.cover_all_points && b.cover_all_points);
}

/// subsets selected in either parent
fn parents_union(a: &Solution, b: &Solution) -> Bitset {
    let mut union = a.selected_subsets.clone();
    union.union_with(&b.selected_subsets);
    union
}

/// child keeping the subsets both parents agree on, cover computed
fn agreed_child(a: &Solution, b: &Solution) -> Solution {
    let mut child = Solution::new(Rc::clone(a.instance()));
    child.selected_subsets.copy_from(&a.selected_subsets);
    child.selected_subsets.intersect_with(&b.selected_subsets);
    child.compute_cover();
    child
}

/// every subset covering at least one point of `points`
fn subsets_covering(instance: &Instance, points: &Bitset) -> Bitset {
    let mut family = Bitset::new(instance.subsets_number());
    for i_subset in 0..instance.subsets_number() {
        if instance.subset_points(i_subset).intersects(points) {
            family.set(i_subset);
        }
    }
    family
}

/// copies parent A
#[derive(Debug)]
struct Identity {
    instance: Rc<Instance>,
}

impl Crossover for Identity {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn apply(&self, a: &Solution, b: &Solution, _rng: &mut Rng) -> Solution {
        check_parents(&self.instance, a, b);
        a.clone()
    }
}

/// selects every subset of either parent, relying on RWLS to shrink it
#[derive(Debug)]
struct Merge {
    instance: Rc<Instance>,
}

impl Crossover for Merge {
    fn name(&self) -> &'static str {
        "merge"
    }

    fn apply(&self, a: &Solution, b: &Solution, _rng: &mut Rng) -> Solution {
        check_parents(&self.instance, a, b);
        let mut child = Solution::new(Rc::clone(&self.instance));
        child.selected_subsets.copy_from(&parents_union(a, b));
        child.compute_cover();
        child
    }
}

/// deterministic greedy restricted to the union of the parents
#[derive(Debug)]
struct GreedyMerge {
    instance: Rc<Instance>,
}

impl Crossover for GreedyMerge {
    fn name(&self) -> &'static str {
        "greedy_merge"
    }

    fn apply(&self, a: &Solution, b: &Solution, _rng: &mut Rng) -> Solution {
        check_parents(&self.instance, a, b);
        let authorized_subsets = parents_union(a, b);
        greedy::restricted_solve(&self.instance, &authorized_subsets)
            .unwrap_or_else(|error| panic!("greedy_merge failed on covering parents: {}", error))
    }
}

/// completion procedure of the subproblem operators
#[derive(Debug, Clone, Copy)]
enum Finisher {
    Random,
    Greedy,
}

/** Keeps the subsets both parents agree on and re-solves the remaining
subproblem. Plain variants complete within the union of the parents;
extended variants may use any subset covering a remaining point. */
#[derive(Debug)]
struct Subproblem {
    instance: Rc<Instance>,
    extended: bool,
    finisher: Finisher,
}

/// uncovered points of `child`, and the family allowed to cover them
fn subproblem_parts(
    instance: &Rc<Instance>,
    child: &Solution,
    a: &Solution,
    b: &Solution,
    extended: bool,
) -> Option<Bitset> {
    if child.cover_all_points {
        return None;
    }
    let mut remaining_points = Bitset::new(instance.points_number());
    remaining_points.set_all();
    remaining_points.difference_with(&child.covered_points);
    Some(if extended {
        subsets_covering(instance, &remaining_points)
    } else {
        parents_union(a, b)
    })
}

impl Crossover for Subproblem {
    fn name(&self) -> &'static str {
        match (self.extended, self.finisher) {
            (false, Finisher::Random) => "subproblem_random",
            (false, Finisher::Greedy) => "subproblem_greedy",
            (true, Finisher::Random) => "extended_subproblem_random",
            (true, Finisher::Greedy) => "extended_subproblem_greedy",
        }
    }

    fn apply(&self, a: &Solution, b: &Solution, rng: &mut Rng) -> Solution {
        check_parents(&self.instance, a, b);
        let mut child = agreed_child(a, b);
        if let Some(authorized_subsets) =
            subproblem_parts(&self.instance, &child, a, b, self.extended)
        {
            let completion = match self.finisher {
                Finisher::Random => {
                    greedy::complete_random_solve(&mut child, Some(&authorized_subsets), rng)
                }
                Finisher::Greedy => greedy::complete_solve(&mut child, Some(&authorized_subsets)),
            };
            completion.unwrap_or_else(|error| {
                panic!("{} failed on covering parents: {}", self.name(), error)
            });
        }
        child
    }
}

/// subproblem crossover completed at random then polished by a short RWLS run
struct SubproblemRwls {
    instance: Rc<Instance>,
    extended: bool,
    rwls: RefCell<Rwls>,
}

impl SubproblemRwls {
    fn new(instance: Rc<Instance>, extended: bool) -> Self {
        let rwls = RefCell::new(Rwls::new(Rc::clone(&instance)));
        Self {
            instance,
            extended,
            rwls,
        }
    }
}

impl fmt::Debug for SubproblemRwls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubproblemRwls")
            .field("instance", &self.instance.name())
            .field("extended", &self.extended)
            .finish()
    }
}

impl Crossover for SubproblemRwls {
    fn name(&self) -> &'static str {
        if self.extended {
            "extended_subproblem_rwls"
        } else {
            "subproblem_rwls"
        }
    }

    fn apply(&self, a: &Solution, b: &Solution, rng: &mut Rng) -> Solution {
        check_parents(&self.instance, a, b);
        let mut child = agreed_child(a, b);
        if let Some(authorized_subsets) =
            subproblem_parts(&self.instance, &child, a, b, self.extended)
        {
            greedy::complete_random_solve(&mut child, Some(&authorized_subsets), rng)
                .unwrap_or_else(|error| {
                    panic!("{} failed on covering parents: {}", self.name(), error)
                });
        }
        self.rwls.borrow_mut().improve(
            &mut child,
            rng,
            Position {
                steps: RWLS_POLISH_STEPS,
                time: f64::MAX,
            },
        );
        child
    }
}
