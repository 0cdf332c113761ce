use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::bitset::Bitset;
use crate::error::{Error, Result};
use crate::instance::{Instance, InstanceSerial};

/** A (partial) cover over an instance.

Invariants: `covered_points` is the union of the coverage of the selected
subsets and `cover_all_points` holds iff `covered_points` is all ones.
Algorithms maintain both incrementally; `compute_cover` re-establishes them
from `selected_subsets` alone. */
#[derive(Clone)]
pub struct Solution {
    instance: Rc<Instance>,
    /// bit i set iff subset i is part of the cover
    pub selected_subsets: Bitset,
    /// bit p set iff some selected subset covers point p
    pub covered_points: Bitset,
    /// true iff every point is covered
    pub cover_all_points: bool,
}

impl Solution {
    /// creates the empty solution over `instance`
    pub fn new(instance: Rc<Instance>) -> Self {
        let selected_subsets = Bitset::new(instance.subsets_number());
        let covered_points = Bitset::new(instance.points_number());
        Self {
            instance,
            selected_subsets,
            covered_points,
            cover_all_points: false,
        }
    }

    /// instance the solution refers to
    pub fn instance(&self) -> &Rc<Instance> {
        &self.instance
    }

    /// recomputes `covered_points` and `cover_all_points` from `selected_subsets`
    pub fn compute_cover(&mut self) {
        self.covered_points.reset_all();
        let subsets_points = self.instance.subsets_points();
        self.selected_subsets.iterate_bits_on(|i_subset| {
            self.covered_points.union_with(&subsets_points[i_subset]);
            true
        });
        self.cover_all_points = self.covered_points.all();
    }

    /// snapshot for the serialization boundary
    pub fn serialize(&self) -> SolutionSerial {
        SolutionSerial {
            instance: self.instance.serialize(),
            selected_subsets: self.selected_subsets.ones().collect(),
        }
    }

    /** Restores `selected_subsets` from a snapshot and recomputes the cover.
    Fails (leaving the solution untouched) when the snapshot identity does
    not match the instance or references an out-of-range subset. */
    pub fn load(&mut self, serial: &SolutionSerial) -> bool {
        if serial.instance.name != self.instance.name() {
            warn!(
                "Solution snapshot for instance {} loaded over instance {}",
                serial.instance.name,
                self.instance.name()
            );
            return false;
        }
        if serial.instance.points != self.instance.points_number()
            || serial.instance.subsets != self.instance.subsets_number()
        {
            warn!("Solution snapshot dimensions do not match instance {}", self.instance.name());
            return false;
        }
        if serial
            .selected_subsets
            .iter()
            .any(|&i_subset| i_subset >= self.instance.subsets_number())
        {
            warn!("Solution snapshot references an out-of-range subset");
            return false;
        }
        self.selected_subsets.reset_all();
        for &i_subset in &serial.selected_subsets {
            self.selected_subsets.set(i_subset);
        }
        self.compute_cover();
        true
    }
}

impl fmt::Debug for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Solution")
            .field("instance", &self.instance.name())
            .field("selected_subsets", &self.selected_subsets.ones().collect::<Vec<_>>())
            .field("cover_all_points", &self.cover_all_points)
            .finish()
    }
}

/// serializable solution snapshot: instance identity plus selected indices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionSerial {
    /// identity of the instance the solution was computed on
    pub instance: InstanceSerial,
    /// indices of the selected subsets, increasing
    pub selected_subsets: Vec<usize>,
}

/** Expands a solution over a reduced instance into a solution over the
parent instance, through the reduction's subset mapping. The expanded
selection has the same cardinality; its cover is recomputed on the parent. */
pub fn expand(reduced_solution: &Solution) -> Result<Solution> {
    let reduction = reduced_solution.instance().reduction().ok_or_else(|| {
        Error::InvalidInput(format!(
            "tried to expand a solution over non-reduced instance {}",
            reduced_solution.instance().name()
        ))
    })?;
    let mut expanded = Solution::new(Rc::clone(&reduction.parent));
    reduced_solution.selected_subsets.iterate_bits_on(|i_subset| {
        expanded.selected_subsets.set(reduction.subsets_mapping[i_subset]);
        true
    });
    expanded.compute_cover();
    debug_assert_eq!(
        expanded.selected_subsets.count(),
        reduced_solution.selected_subsets.count()
    );
    Ok(expanded)
}
