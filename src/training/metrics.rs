//! Classification metrics and the evaluation report

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Fraction of predictions on the correct side of the 0.5 threshold.
pub fn accuracy(probabilities: &[f64], labels: &[usize]) -> f64 {
    if probabilities.is_empty() {
        return 0.0;
    }
    let correct = probabilities
        .iter()
        .zip(labels)
        .filter(|(&p, &l)| usize::from(p >= 0.5) == l)
        .count();
    correct as f64 / probabilities.len() as f64
}

/// Area under the ROC curve via the Mann-Whitney U statistic.
///
/// Tied scores receive the average of the ranks they span. Returns `None`
/// when either class is absent, since the curve is undefined there.
pub fn roc_auc(probabilities: &[f64], labels: &[usize]) -> Option<f64> {
    let n_pos = labels.iter().filter(|&&l| l == 1).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..probabilities.len()).collect();
    order.sort_by(|&a, &b| {
        probabilities[a]
            .partial_cmp(&probabilities[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Tie-averaged ranks, 1-based
    let mut ranks = vec![0.0; probabilities.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && probabilities[order[j + 1]] == probabilities[order[i]] {
            j += 1;
        }
        let mean_rank = (i + j + 2) as f64 / 2.0;
        for &idx in &order[i..=j] {
            ranks[idx] = mean_rank;
        }
        i = j + 1;
    }

    let rank_sum_pos: f64 = labels
        .iter()
        .zip(&ranks)
        .filter(|(&l, _)| l == 1)
        .map(|(_, &r)| r)
        .sum();

    let u = rank_sum_pos - (n_pos * (n_pos + 1)) as f64 / 2.0;
    Some(u / (n_pos as f64 * n_neg as f64))
}

/// One feature's mean Gini importance across the forest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Training and evaluation summary for a fitted model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub model_version: String,
    pub train_accuracy: f64,
    pub test_accuracy: f64,
    pub roc_auc: f64,
    pub cv_mean: f64,
    pub cv_std: f64,
    pub feature_importance: Vec<FeatureImportance>,
}

impl EvaluationReport {
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model {}", self.model_version)?;
        writeln!(f, "  Train accuracy: {:.3}", self.train_accuracy)?;
        writeln!(f, "  Test accuracy:  {:.3}", self.test_accuracy)?;
        writeln!(f, "  ROC-AUC:        {:.3}", self.roc_auc)?;
        writeln!(
            f,
            "  CV AUC:         {:.3} +/- {:.3}",
            self.cv_mean, self.cv_std
        )?;
        writeln!(f, "  Feature importances:")?;
        for fi in &self.feature_importance {
            writeln!(f, "    {:<22} {:.4}", fi.feature, fi.importance)?;
        }
        Ok(())
    }
}
