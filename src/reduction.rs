use std::rc::Rc;

use tracing::info;

use crate::bitset::Bitset;
use crate::instance::{Instance, Reduction};

/** Reduces an instance to an equivalent smaller one.

Two elimination passes, both standard for unicost set cover:
- a subset is dropped when its coverage is included in another kept
  subset's coverage (equal coverages keep the lowest index);
- a point is dropped when some kept point is covered by a subset family
  included in its own (covering the kept point then covers the dropped
  one; equal families keep the lowest index).

The result carries a [`Reduction`] mapping back to `instance`, so any
solution over it can be expanded with [`crate::solution::expand`] without
changing its cardinality. When nothing can be eliminated the reduced
instance is an identity-mapped copy. */
pub fn reduce(instance: &Rc<Instance>) -> Rc<Instance> {
    let points_number = instance.points_number();
    let subsets_number = instance.subsets_number();

    // dominated subsets
    let mut keep_subset = vec![true; subsets_number];
    for i_subset in 0..subsets_number {
        if !keep_subset[i_subset] {
            continue;
        }
        for i_other in 0..subsets_number {
            if i_other == i_subset || !keep_subset[i_other] {
                continue;
            }
            let points = instance.subset_points(i_subset);
            let other_points = instance.subset_points(i_other);
            if points.is_subset_of(other_points) && (points != other_points || i_other < i_subset) {
                keep_subset[i_subset] = false;
                break;
            }
        }
    }
    let subsets_mapping: Vec<usize> = (0..subsets_number).filter(|&i| keep_subset[i]).collect();

    // subsets covering each point, restricted to the kept subsets
    let mut covering_subsets = vec![Bitset::new(subsets_mapping.len()); points_number];
    for (i_reduced, &i_subset) in subsets_mapping.iter().enumerate() {
        instance.subset_points(i_subset).iterate_bits_on(|i_point| {
            covering_subsets[i_point].set(i_reduced);
            true
        });
    }

    // dominated points
    let mut keep_point = vec![true; points_number];
    for i_point in 0..points_number {
        if !keep_point[i_point] {
            continue;
        }
        for i_other in 0..points_number {
            if i_other == i_point || !keep_point[i_other] {
                continue;
            }
            let covering = &covering_subsets[i_point];
            let other_covering = &covering_subsets[i_other];
            // every subset covering i_other covers i_point as well
            if other_covering.is_subset_of(covering)
                && (covering != other_covering || i_other < i_point)
            {
                keep_point[i_point] = false;
                break;
            }
        }
    }
    let points_mapping: Vec<usize> = (0..points_number).filter(|&p| keep_point[p]).collect();

    // rebuild the kept subsets over the kept points
    let subsets_points: Vec<Bitset> = subsets_mapping
        .iter()
        .map(|&i_subset| {
            let parent_points = instance.subset_points(i_subset);
            let mut points = Bitset::new(points_mapping.len());
            for (i_reduced, &i_point) in points_mapping.iter().enumerate() {
                if parent_points.test(i_point) {
                    points.set(i_reduced);
                }
            }
            points
        })
        .collect();

    info!(
        "({}) Reduced instance from {} points and {} subsets to {} points and {} subsets",
        instance.name(),
        points_number,
        subsets_number,
        points_mapping.len(),
        subsets_mapping.len()
    );

    Rc::new(Instance::new_reduced(
        format!("{}_reduced", instance.name()),
        points_mapping.len(),
        subsets_points,
        Reduction {
            parent: Rc::clone(instance),
            points_mapping,
            subsets_mapping,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::tests::instance_from_lists;
    use crate::solution::{self, Solution};

    #[test]
    fn test_dominated_subset_removed() {
        // subset 1 is included in subset 0, subset 3 duplicates subset 2
        let instance = Rc::new(instance_from_lists(
            "columns",
            3,
            &[&[0, 1], &[0], &[2], &[2]],
        ));
        let reduced = reduce(&instance);
        let reduction = reduced.reduction().unwrap();
        assert_eq!(reduction.subsets_mapping, vec![0, 2]);
    }

    #[test]
    fn test_dominated_point_removed() {
        // no subset dominates another; any cover of point 0 or 2 covers point 1
        let instance = Rc::new(instance_from_lists("rows", 3, &[&[0, 1], &[1, 2]]));
        let reduced = reduce(&instance);
        let reduction = reduced.reduction().unwrap();
        assert_eq!(reduction.subsets_mapping, vec![0, 1]);
        assert_eq!(reduction.points_mapping, vec![0, 2]);
    }

    #[test]
    fn test_reduced_coverage_matches_parent() {
        let instance = Rc::new(instance_from_lists(
            "restrict",
            4,
            &[&[0, 1], &[1, 2, 3], &[0, 3]],
        ));
        let reduced = reduce(&instance);
        let reduction = reduced.reduction().unwrap();
        for (i_reduced, &i_parent) in reduction.subsets_mapping.iter().enumerate() {
            for (p_reduced, &p_parent) in reduction.points_mapping.iter().enumerate() {
                assert_eq!(
                    reduced.subset_points(i_reduced).test(p_reduced),
                    instance.subset_points(i_parent).test(p_parent)
                );
            }
        }
    }

    #[test]
    fn test_expand_preserves_cover_and_cardinality() {
        let instance = Rc::new(instance_from_lists(
            "expand",
            4,
            &[&[0, 1], &[1], &[2, 3], &[3]],
        ));
        let reduced = reduce(&instance);
        // cover the reduced instance completely
        let mut reduced_solution = Solution::new(Rc::clone(&reduced));
        for i_subset in 0..reduced.subsets_number() {
            reduced_solution.selected_subsets.set(i_subset);
        }
        reduced_solution.compute_cover();
        assert!(reduced_solution.cover_all_points);

        let expanded = solution::expand(&reduced_solution).unwrap();
        assert!(expanded.cover_all_points);
        assert_eq!(
            expanded.selected_subsets.count(),
            reduced_solution.selected_subsets.count()
        );
    }
}
