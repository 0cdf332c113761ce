use std::fmt;
use std::rc::Rc;

use fastrand::Rng;

use crate::instance::Instance;
use crate::rwls::Weight;

/** A weight crossover combines the RWLS weight vectors of two parents into
the seed weights of a child. `apply1` and `apply2` cover the asymmetric use
by the memetic driver: `apply1` seeds the child bred from (a, b), `apply2`
the alternate child bred from (b, a). Symmetric operators implement both
identically. */
pub trait WeightCrossover: fmt::Debug {
    /// stable identifier used for configuration
    fn name(&self) -> &'static str;

    /// seed weights of the first child
    fn apply1(&self, a: &[Weight], b: &[Weight], rng: &mut Rng) -> Vec<Weight>;

    /// seed weights of the alternate child
    fn apply2(&self, a: &[Weight], b: &[Weight], rng: &mut Rng) -> Vec<Weight> {
        self.apply1(a, b, rng)
    }
}

/// names accepted by [`by_name`], in registry order
pub const OPERATOR_NAMES: &[&str] = &[
    "reset",
    "keep",
    "average",
    "mix_random",
    "add",
    "difference",
    "max",
    "min",
    "minmax",
    "shuffle",
];

/// resolves an operator name, capturing the instance; `None` when unknown
pub fn by_name(name: &str, instance: &Rc<Instance>) -> Option<Box<dyn WeightCrossover>> {
    let instance = Rc::clone(instance);
    match name {
        "reset" => Some(Box::new(Reset { instance })),
        "keep" => Some(Box::new(Keep { instance })),
        "average" => Some(Box::new(Average { instance })),
        "mix_random" => Some(Box::new(MixRandom { instance })),
        "add" => Some(Box::new(Add { instance })),
        "difference" => Some(Box::new(Difference { instance })),
        "max" => Some(Box::new(Max { instance })),
        "min" => Some(Box::new(Min { instance })),
        "minmax" => Some(Box::new(MinMax { instance })),
        "shuffle" => Some(Box::new(Shuffle { instance })),
        _ => None,
    }
}

macro_rules! check_lengths {
    ($self:ident, $a:ident, $b:ident) => {
        debug_assert_eq!($a.len(), $self.instance.points_number());
        debug_assert_eq!($b.len(), $self.instance.points_number());
    };
}

/// forgets both parents: all weights back to one
#[derive(Debug)]
struct Reset {
    instance: Rc<Instance>,
}

impl WeightCrossover for Reset {
    fn name(&self) -> &'static str {
        "reset"
    }

    fn apply1(&self, a: &[Weight], b: &[Weight], _rng: &mut Rng) -> Vec<Weight> {
        check_lengths!(self, a, b);
        vec![1; self.instance.points_number()]
    }
}

/// keeps the first parent's weights (the second parent's for the alternate child)
#[derive(Debug)]
struct Keep {
    instance: Rc<Instance>,
}

impl WeightCrossover for Keep {
    fn name(&self) -> &'static str {
        "keep"
    }

    fn apply1(&self, a: &[Weight], b: &[Weight], _rng: &mut Rng) -> Vec<Weight> {
        check_lengths!(self, a, b);
        a.to_vec()
    }

    fn apply2(&self, a: &[Weight], b: &[Weight], _rng: &mut Rng) -> Vec<Weight> {
        check_lengths!(self, a, b);
        b.to_vec()
    }
}

/// elementwise floored mean
#[derive(Debug)]
struct Average {
    instance: Rc<Instance>,
}

impl WeightCrossover for Average {
    fn name(&self) -> &'static str {
        "average"
    }

    fn apply1(&self, a: &[Weight], b: &[Weight], _rng: &mut Rng) -> Vec<Weight> {
        check_lengths!(self, a, b);
        a.iter()
            .zip(b)
            .map(|(&weight_a, &weight_b)| (weight_a + weight_b) / 2)
            .collect()
    }
}

/// each position picks one parent's weight uniformly
#[derive(Debug)]
struct MixRandom {
    instance: Rc<Instance>,
}

impl WeightCrossover for MixRandom {
    fn name(&self) -> &'static str {
        "mix_random"
    }

    fn apply1(&self, a: &[Weight], b: &[Weight], rng: &mut Rng) -> Vec<Weight> {
        check_lengths!(self, a, b);
        a.iter()
            .zip(b)
            .map(|(&weight_a, &weight_b)| if rng.bool() { weight_a } else { weight_b })
            .collect()
    }
}

/// elementwise sum
#[derive(Debug)]
struct Add {
    instance: Rc<Instance>,
}

impl WeightCrossover for Add {
    fn name(&self) -> &'static str {
        "add"
    }

    fn apply1(&self, a: &[Weight], b: &[Weight], _rng: &mut Rng) -> Vec<Weight> {
        check_lengths!(self, a, b);
        a.iter()
            .zip(b)
            .map(|(&weight_a, &weight_b)| weight_a + weight_b)
            .collect()
    }
}

/// elementwise absolute difference
#[derive(Debug)]
struct Difference {
    instance: Rc<Instance>,
}

impl WeightCrossover for Difference {
    fn name(&self) -> &'static str {
        "difference"
    }

    fn apply1(&self, a: &[Weight], b: &[Weight], _rng: &mut Rng) -> Vec<Weight> {
        check_lengths!(self, a, b);
        a.iter()
            .zip(b)
            .map(|(&weight_a, &weight_b)| (weight_a - weight_b).abs())
            .collect()
    }
}

/// elementwise maximum
#[derive(Debug)]
struct Max {
    instance: Rc<Instance>,
}

impl WeightCrossover for Max {
    fn name(&self) -> &'static str {
        "max"
    }

    fn apply1(&self, a: &[Weight], b: &[Weight], _rng: &mut Rng) -> Vec<Weight> {
        check_lengths!(self, a, b);
        a.iter()
            .zip(b)
            .map(|(&weight_a, &weight_b)| weight_a.max(weight_b))
            .collect()
    }
}

/// elementwise minimum
#[derive(Debug)]
struct Min {
    instance: Rc<Instance>,
}

impl WeightCrossover for Min {
    fn name(&self) -> &'static str {
        "min"
    }

    fn apply1(&self, a: &[Weight], b: &[Weight], _rng: &mut Rng) -> Vec<Weight> {
        check_lengths!(self, a, b);
        a.iter()
            .zip(b)
            .map(|(&weight_a, &weight_b)| weight_a.min(weight_b))
            .collect()
    }
}

/// maximum for the first child, minimum for the alternate child
#[derive(Debug)]
struct MinMax {
    instance: Rc<Instance>,
}

impl WeightCrossover for MinMax {
    fn name(&self) -> &'static str {
        "minmax"
    }

    fn apply1(&self, a: &[Weight], b: &[Weight], _rng: &mut Rng) -> Vec<Weight> {
        check_lengths!(self, a, b);
        a.iter()
            .zip(b)
            .map(|(&weight_a, &weight_b)| weight_a.max(weight_b))
            .collect()
    }

    fn apply2(&self, a: &[Weight], b: &[Weight], _rng: &mut Rng) -> Vec<Weight> {
        check_lengths!(self, a, b);
        a.iter()
            .zip(b)
            .map(|(&weight_a, &weight_b)| weight_a.min(weight_b))
            .collect()
    }
}

/// random permutation of the first parent (the second for the alternate child)
#[derive(Debug)]
struct Shuffle {
    instance: Rc<Instance>,
}

impl WeightCrossover for Shuffle {
    fn name(&self) -> &'static str {
        "shuffle"
    }

    fn apply1(&self, a: &[Weight], b: &[Weight], rng: &mut Rng) -> Vec<Weight> {
        check_lengths!(self, a, b);
        let mut weights = a.to_vec();
        rng.shuffle(&mut weights);
        weights
    }

    fn apply2(&self, a: &[Weight], b: &[Weight], rng: &mut Rng) -> Vec<Weight> {
        check_lengths!(self, a, b);
        let mut weights = b.to_vec();
        rng.shuffle(&mut weights);
        weights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::tests::instance_from_lists;

    fn fixture() -> (Rc<Instance>, Vec<Weight>, Vec<Weight>) {
        let instance = Rc::new(instance_from_lists(
            "weights",
            4,
            &[&[0, 1], &[2, 3], &[0, 2]],
        ));
        (instance, vec![1, 4, 2, 8], vec![3, 2, 2, 5])
    }

    #[test]
    fn test_registry_resolves_every_name() {
        let (instance, _, _) = fixture();
        for name in OPERATOR_NAMES {
            let operator = by_name(name, &instance).unwrap();
            assert_eq!(operator.name(), *name);
        }
        assert!(by_name("unknown", &instance).is_none());
    }

    #[test]
    fn test_elementwise_operators() {
        let (instance, a, b) = fixture();
        let mut rng = Rng::with_seed(0);
        let cases: &[(&str, Vec<Weight>)] = &[
            ("reset", vec![1, 1, 1, 1]),
            ("average", vec![2, 3, 2, 6]),
            ("add", vec![4, 6, 4, 13]),
            ("difference", vec![2, 2, 0, 3]),
            ("max", vec![3, 4, 2, 8]),
            ("min", vec![1, 2, 2, 5]),
        ];
        for (name, expected) in cases {
            let operator = by_name(name, &instance).unwrap();
            assert_eq!(&operator.apply1(&a, &b, &mut rng), expected, "{}", name);
            assert_eq!(&operator.apply2(&a, &b, &mut rng), expected, "{}", name);
        }
    }

    #[test]
    fn test_keep_is_asymmetric() {
        let (instance, a, b) = fixture();
        let operator = by_name("keep", &instance).unwrap();
        let mut rng = Rng::with_seed(0);
        assert_eq!(operator.apply1(&a, &b, &mut rng), a);
        assert_eq!(operator.apply2(&a, &b, &mut rng), b);
    }

    #[test]
    fn test_minmax_entries() {
        let (instance, a, b) = fixture();
        let operator = by_name("minmax", &instance).unwrap();
        let mut rng = Rng::with_seed(0);
        assert_eq!(operator.apply1(&a, &b, &mut rng), vec![3, 4, 2, 8]);
        assert_eq!(operator.apply2(&a, &b, &mut rng), vec![1, 2, 2, 5]);
    }

    #[test]
    fn test_mix_random_picks_parent_values() {
        let (instance, a, b) = fixture();
        let operator = by_name("mix_random", &instance).unwrap();
        let mut rng = Rng::with_seed(9);
        let mixed = operator.apply1(&a, &b, &mut rng);
        for (i_point, &weight) in mixed.iter().enumerate() {
            assert!(weight == a[i_point] || weight == b[i_point]);
        }
    }

    #[test]
    fn test_shuffle_permutes() {
        let (instance, a, b) = fixture();
        let operator = by_name("shuffle", &instance).unwrap();
        let mut rng = Rng::with_seed(3);
        let mut shuffled = operator.apply1(&a, &b, &mut rng);
        shuffled.sort_unstable();
        let mut sorted_a = a.clone();
        sorted_a.sort_unstable();
        assert_eq!(shuffled, sorted_a);
        let mut alternate = operator.apply2(&a, &b, &mut rng);
        alternate.sort_unstable();
        let mut sorted_b = b.clone();
        sorted_b.sort_unstable();
        assert_eq!(alternate, sorted_b);
    }
}
