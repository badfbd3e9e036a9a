use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

// ---------------------------------------------------------------------------
// Seeded train/test partition
// ---------------------------------------------------------------------------

/// Fixed shuffle seed so repeated runs on the same rows produce the same
/// partition, and therefore the same model and metrics.
pub const SPLIT_SEED: u64 = 42;

/// Fraction of rows held out for evaluation.
pub const TEST_FRACTION: f64 = 0.2;

/// Disjoint, exhaustive partition of the input row indices.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Partition `indices` 80/20 after a seeded shuffle.
///
/// `|test| = round(0.2 · n)` clamped so both halves are non-empty; callers
/// enforce their own minimum row count before splitting.
pub fn train_test_split(indices: &[usize], seed: u64) -> TrainTestSplit {
    let mut shuffled: Vec<usize> = indices.to_vec();
    let mut rng = StdRng::seed_from_u64(seed);
    shuffled.shuffle(&mut rng);

    let n = shuffled.len();
    let n_test = ((n as f64 * TEST_FRACTION).round() as usize).clamp(1, n.saturating_sub(1).max(1));
    let train = shuffled.split_off(n_test);

    TrainTestSplit {
        train,
        test: shuffled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn split_is_disjoint_and_exhaustive() {
        let indices: Vec<usize> = (0..103).collect();
        let split = train_test_split(&indices, SPLIT_SEED);

        let train: BTreeSet<usize> = split.train.iter().copied().collect();
        let test: BTreeSet<usize> = split.test.iter().copied().collect();
        assert!(train.is_disjoint(&test));

        let mut union: BTreeSet<usize> = train;
        union.extend(&test);
        assert_eq!(union, indices.iter().copied().collect());
    }

    #[test]
    fn test_size_is_about_a_fifth() {
        for n in [10usize, 50, 103, 200] {
            let indices: Vec<usize> = (0..n).collect();
            let split = train_test_split(&indices, SPLIT_SEED);
            let expected = (n as f64 * TEST_FRACTION).round() as isize;
            let got = split.test.len() as isize;
            assert!(
                (got - expected).abs() <= 1,
                "n={n}: |test|={got}, expected ≈{expected}"
            );
            assert_eq!(split.train.len() + split.test.len(), n);
        }
    }

    #[test]
    fn same_seed_gives_the_same_partition() {
        let indices: Vec<usize> = (0..60).collect();
        let a = train_test_split(&indices, SPLIT_SEED);
        let b = train_test_split(&indices, SPLIT_SEED);
        assert_eq!(a.train, b.train);
        assert_eq!(a.test, b.test);
    }

    #[test]
    fn two_rows_still_split_into_non_empty_halves() {
        let split = train_test_split(&[7, 9], SPLIT_SEED);
        assert_eq!(split.train.len(), 1);
        assert_eq!(split.test.len(), 1);
    }
}
