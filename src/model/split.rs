//! Stratified train/evaluation partitioning

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::{Result, RiskError};

/// Index sets for the training and evaluation subsets
#[derive(Debug, Clone)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub eval: Vec<usize>,
}

/// Partition row indices so both subsets preserve the positive rate.
///
/// Each class is shuffled with the seeded RNG and cut at `train_fraction`,
/// so repeated runs with the same seed produce the same partition. Requires
/// at least 2 positive examples, otherwise stratification is impossible.
pub fn stratified_split(labels: &[usize], train_fraction: f64, seed: u64) -> Result<SplitIndices> {
    let positives: Vec<usize> = indices_of(labels, 1);
    let negatives: Vec<usize> = indices_of(labels, 0);

    if positives.len() < 2 {
        return Err(RiskError::TooFewPositives {
            found: positives.len(),
        });
    }
    if !(0.0..1.0).contains(&train_fraction) || train_fraction == 0.0 {
        return Err(RiskError::Config(format!(
            "train_fraction must be in (0, 1), got {}",
            train_fraction
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut eval = Vec::new();

    for class in [positives, negatives] {
        let mut shuffled = class;
        shuffled.shuffle(&mut rng);

        let take = if shuffled.len() >= 2 {
            // Both subsets get at least one example of the class
            let n = (shuffled.len() as f64 * train_fraction).round() as usize;
            n.clamp(1, shuffled.len() - 1)
        } else {
            shuffled.len()
        };

        train.extend_from_slice(&shuffled[..take]);
        eval.extend_from_slice(&shuffled[take..]);
    }

    train.sort_unstable();
    eval.sort_unstable();
    Ok(SplitIndices { train, eval })
}

fn indices_of(labels: &[usize], class: usize) -> Vec<usize> {
    labels
        .iter()
        .enumerate()
        .filter(|(_, &label)| label == class)
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positive_rate(labels: &[usize], indices: &[usize]) -> f64 {
        let positives = indices.iter().filter(|&&i| labels[i] == 1).count();
        positives as f64 / indices.len() as f64
    }

    #[test]
    fn test_split_preserves_positive_rate() {
        // 200 rows, 20% positive
        let labels: Vec<usize> = (0..200).map(|i| usize::from(i % 5 == 0)).collect();
        let split = stratified_split(&labels, 0.8, 42).unwrap();

        assert_eq!(split.train.len() + split.eval.len(), 200);
        let overall = 0.2;
        assert!((positive_rate(&labels, &split.train) - overall).abs() <= 0.02);
        assert!((positive_rate(&labels, &split.eval) - overall).abs() <= 0.02);
    }

    #[test]
    fn test_split_deterministic_under_seed() {
        let labels: Vec<usize> = (0..50).map(|i| usize::from(i % 4 == 0)).collect();
        let a = stratified_split(&labels, 0.8, 7).unwrap();
        let b = stratified_split(&labels, 0.8, 7).unwrap();
        assert_eq!(a.train, b.train);
        assert_eq!(a.eval, b.eval);

        let c = stratified_split(&labels, 0.8, 8).unwrap();
        assert_ne!(a.train, c.train);
    }

    #[test]
    fn test_split_disjoint_and_complete() {
        let labels: Vec<usize> = (0..37).map(|i| usize::from(i % 6 == 0)).collect();
        let split = stratified_split(&labels, 0.8, 1).unwrap();

        let mut all: Vec<usize> = split.train.iter().chain(&split.eval).copied().collect();
        all.sort_unstable();
        let expected: Vec<usize> = (0..37).collect();
        assert_eq!(all, expected);
    }

    #[test]
    fn test_too_few_positives_rejected() {
        let labels = vec![0, 0, 0, 1, 0, 0];
        let err = stratified_split(&labels, 0.8, 42).unwrap_err();
        assert!(matches!(err, RiskError::TooFewPositives { found: 1 }));
    }

    #[test]
    fn test_both_subsets_get_positives() {
        let labels = vec![0, 0, 0, 0, 0, 0, 0, 0, 1, 1];
        let split = stratified_split(&labels, 0.8, 3).unwrap();
        assert!(split.train.iter().any(|&i| labels[i] == 1));
        assert!(split.eval.iter().any(|&i| labels[i] == 1));
    }

    #[test]
    fn test_invalid_fraction_rejected() {
        let labels = vec![1, 1, 0, 0];
        assert!(stratified_split(&labels, 0.0, 1).is_err());
        assert!(stratified_split(&labels, 1.0, 1).is_err());
    }
}
