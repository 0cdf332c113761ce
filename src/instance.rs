use std::rc::Rc;

use fastrand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::bitset::Bitset;

/** Maps a reduced instance back to the instance it was built from.

`points_mapping[p]` (resp. `subsets_mapping[i]`) is the index in the parent
instance of the reduced point `p` (resp. reduced subset `i`). Every reduced
subset's coverage equals the parent subset's coverage restricted to the
kept points. */
#[derive(Debug, Clone)]
pub struct Reduction {
    /// instance the reduction was computed from
    pub parent: Rc<Instance>,
    /// reduced point index -> parent point index
    pub points_mapping: Vec<usize>,
    /// reduced subset index -> parent subset index
    pub subsets_mapping: Vec<usize>,
}

/** A unicost set cover instance: a ground set of points and a family of
subsets over it. Immutable once constructed; shared by reference between
solutions and solver runs. */
#[derive(Debug)]
pub struct Instance {
    name: String,
    points_number: usize,
    subsets_number: usize,
    /// subsets_points[i]: bitset of length points_number, bit p set iff subset i covers point p
    subsets_points: Vec<Bitset>,
    /// present iff this instance was produced by the reducer
    reduction: Option<Reduction>,
}

impl Instance {
    /// builds an instance from its subset coverage bitsets
    pub fn new(name: impl Into<String>, points_number: usize, subsets_points: Vec<Bitset>) -> Self {
        for subset_points in &subsets_points {
            assert_eq!(subset_points.len(), points_number, "subset bitset length mismatch");
        }
        Self {
            name: name.into(),
            points_number,
            subsets_number: subsets_points.len(),
            subsets_points,
            reduction: None,
        }
    }

    /// builds a reduced instance carrying its expansion mapping
    pub fn new_reduced(
        name: impl Into<String>,
        points_number: usize,
        subsets_points: Vec<Bitset>,
        reduction: Reduction,
    ) -> Self {
        let mut instance = Self::new(name, points_number, subsets_points);
        assert_eq!(reduction.points_mapping.len(), instance.points_number);
        assert_eq!(reduction.subsets_mapping.len(), instance.subsets_number);
        instance.reduction = Some(reduction);
        instance
    }

    /// instance name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// size of the ground set
    pub fn points_number(&self) -> usize {
        self.points_number
    }

    /// size of the subset family
    pub fn subsets_number(&self) -> usize {
        self.subsets_number
    }

    /// points covered by subset `i`
    pub fn subset_points(&self, i: usize) -> &Bitset {
        &self.subsets_points[i]
    }

    /// all subset coverage bitsets, indexed by subset
    pub fn subsets_points(&self) -> &[Bitset] {
        &self.subsets_points
    }

    /// reduction mapping when this instance was produced by the reducer
    pub fn reduction(&self) -> Option<&Reduction> {
        self.reduction.as_ref()
    }

    /// identity snapshot crossing the serialization boundary
    pub fn serialize(&self) -> InstanceSerial {
        InstanceSerial {
            name: self.name.clone(),
            points: self.points_number,
            subsets: self.subsets_number,
        }
    }
}

/// serializable instance identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSerial {
    /// instance name
    pub name: String,
    /// size of the ground set
    pub points: usize,
    /// size of the subset family
    pub subsets: usize,
}

/// true iff the union of all subsets covers the whole ground set
pub fn has_solution(instance: &Instance) -> bool {
    let mut covered = Bitset::new(instance.points_number());
    for subset_points in instance.subsets_points() {
        covered.union_with(subset_points);
        if covered.all() {
            return true;
        }
    }
    covered.all()
}

/** Generates a random instance where every point is covered by a number of
subsets drawn uniformly in `min_covering_subsets..=max_covering_subsets`
(so the instance always has a solution). Used by tests and benchmarks. */
pub fn generate(
    name: impl Into<String>,
    points_number: usize,
    subsets_number: usize,
    rng: &mut Rng,
    min_covering_subsets: usize,
    max_covering_subsets: usize,
) -> Instance {
    assert!(points_number > 0 && subsets_number > 0);
    assert!(min_covering_subsets >= 1);
    assert!(min_covering_subsets <= max_covering_subsets);
    assert!(max_covering_subsets <= subsets_number);
    let mut subsets_points = vec![Bitset::new(points_number); subsets_number];
    for i_point in 0..points_number {
        let covering_subsets = rng.usize(min_covering_subsets..=max_covering_subsets);
        let mut covered = 0;
        while covered < covering_subsets {
            let i_subset = rng.usize(0..subsets_number);
            if !subsets_points[i_subset].test(i_point) {
                subsets_points[i_subset].set(i_point);
                covered += 1;
            }
        }
    }
    let instance = Instance::new(name, points_number, subsets_points);
    info!(
        "Generated instance {} with {} points and {} subsets",
        instance.name(),
        points_number,
        subsets_number
    );
    instance
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// builds an instance from explicit point lists, one per subset
    pub(crate) fn instance_from_lists(name: &str, points_number: usize, subsets: &[&[usize]]) -> Instance {
        let subsets_points = subsets
            .iter()
            .map(|points| {
                let mut bitset = Bitset::new(points_number);
                for &point in *points {
                    bitset.set(point);
                }
                bitset
            })
            .collect();
        Instance::new(name, points_number, subsets_points)
    }

    #[test]
    fn test_has_solution() {
        let solvable = instance_from_lists("solvable", 3, &[&[0], &[1], &[2]]);
        assert!(has_solution(&solvable));
        let unsolvable = instance_from_lists("unsolvable", 3, &[&[0], &[1]]);
        assert!(!has_solution(&unsolvable));
    }

    #[test]
    fn test_generate_always_solvable() {
        let mut rng = Rng::with_seed(42);
        for _ in 0..10 {
            let instance = generate("generated", 50, 20, &mut rng, 1, 4);
            assert!(has_solution(&instance));
            assert_eq!(instance.points_number(), 50);
            assert_eq!(instance.subsets_number(), 20);
        }
    }

    #[test]
    fn test_generate_determinism() {
        let first = {
            let mut rng = Rng::with_seed(7);
            generate("a", 30, 10, &mut rng, 1, 3)
        };
        let second = {
            let mut rng = Rng::with_seed(7);
            generate("a", 30, 10, &mut rng, 1, 3)
        };
        assert_eq!(first.subsets_points(), second.subsets_points());
    }
}
