//! Statistical outlier detection over report feature vectors.
//!
//! A fresh isolation forest is fitted on every invocation (no state
//! survives across batches) with a fixed seed, so a given batch always
//! produces the same anomaly set. Batches below the minimum sample count
//! skip the model entirely and fall back to high-priority reports.

use crate::detect::features::{self, FEATURE_DIM};
use crate::model::Report;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

/// Detector configuration. Defaults mirror the operational tuning:
/// 10% expected contamination, 100 trees, seed 42.
pub struct OutlierDetector {
    pub min_samples: usize,
    pub contamination: f64,
    pub trees: usize,
    pub seed: u64,
}

impl Default for OutlierDetector {
    fn default() -> Self {
        Self {
            min_samples: 10,
            contamination: 0.1,
            trees: 100,
            seed: 42,
        }
    }
}

impl OutlierDetector {
    /// Detect anomalous reports in a batch, preserving input order.
    ///
    /// Below `min_samples` the model is not trained; the priority >= 4
    /// subset is returned instead as a coverage fallback, not a
    /// statistical judgment. An empty batch yields an empty result.
    pub fn detect(&self, reports: &[Report]) -> Vec<Report> {
        if reports.is_empty() {
            return Vec::new();
        }

        if reports.len() < self.min_samples {
            warn!(
                have = reports.len(),
                needed = self.min_samples,
                "Too few samples for outlier analysis, falling back to high-priority reports"
            );
            return reports.iter().filter(|r| r.priority >= 4).cloned().collect();
        }

        let vectors = features::extract_batch(reports);
        let forest = IsolationForest::fit(&vectors, self.trees, self.seed);
        let scores: Vec<f64> = vectors.iter().map(|v| forest.score(v)).collect();

        // Flag exactly ceil(contamination * n) of the highest-scored rows.
        let flagged = ((self.contamination * reports.len() as f64).ceil() as usize)
            .min(reports.len());

        let mut ranked: Vec<usize> = (0..scores.len()).collect();
        ranked.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });

        let mut is_outlier = vec![false; reports.len()];
        for &i in ranked.iter().take(flagged) {
            is_outlier[i] = true;
        }

        let anomalies: Vec<Report> = reports
            .iter()
            .zip(&is_outlier)
            .filter(|(_, &flag)| flag)
            .map(|(r, _)| r.clone())
            .collect();

        info!(
            anomalies = anomalies.len(),
            total = reports.len(),
            "Outlier scan complete"
        );
        anomalies
    }
}

/// Classic isolation forest: anomalies isolate in fewer random splits,
/// so shorter average path lengths mean higher anomaly scores.
struct IsolationForest {
    trees: Vec<Node>,
    sample_size: usize,
}

enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        size: usize,
    },
}

impl IsolationForest {
    fn fit(vectors: &[[f64; FEATURE_DIM]], trees: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let sample_size = vectors.len().min(256);
        let max_depth = (sample_size as f64).log2().ceil() as usize;

        let mut built = Vec::with_capacity(trees);
        for _ in 0..trees {
            let mut indices: Vec<usize> = (0..vectors.len()).collect();
            indices.shuffle(&mut rng);
            indices.truncate(sample_size);
            built.push(build_node(vectors, &indices, 0, max_depth, &mut rng));
        }

        Self {
            trees: built,
            sample_size,
        }
    }

    /// Anomaly score in (0, 1]; values near 1 isolate almost immediately.
    fn score(&self, vector: &[f64; FEATURE_DIM]) -> f64 {
        let total: f64 = self
            .trees
            .iter()
            .map(|tree| path_length(tree, vector, 0))
            .sum();
        let avg_path = total / self.trees.len() as f64;
        let norm = average_path_length(self.sample_size);
        if norm <= 0.0 {
            return 0.5;
        }
        2f64.powf(-avg_path / norm)
    }
}

fn build_node(
    vectors: &[[f64; FEATURE_DIM]],
    indices: &[usize],
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
) -> Node {
    if indices.len() <= 1 || depth >= max_depth {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    // Pick a split feature among those with spread; constant partitions
    // cannot be split further.
    let mut candidates: Vec<(usize, f64, f64)> = Vec::new();
    for feature in 0..FEATURE_DIM {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &i in indices {
            let v = vectors[i][feature];
            lo = lo.min(v);
            hi = hi.max(v);
        }
        if hi > lo {
            candidates.push((feature, lo, hi));
        }
    }

    if candidates.is_empty() {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    let (feature, lo, hi) = candidates[rng.gen_range(0..candidates.len())];
    let threshold = rng.gen_range(lo..hi);

    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .copied()
        .partition(|&i| vectors[i][feature] < threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(build_node(vectors, &left, depth + 1, max_depth, rng)),
        right: Box::new(build_node(vectors, &right, depth + 1, max_depth, rng)),
    }
}

fn path_length(node: &Node, vector: &[f64; FEATURE_DIM], depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            if vector[*feature] < *threshold {
                path_length(left, vector, depth + 1)
            } else {
                path_length(right, vector, depth + 1)
            }
        }
    }
}

/// Expected path length of an unsuccessful BST search over n points,
/// the standard isolation-forest normalization term.
fn average_path_length(n: usize) -> f64 {
    if n < 2 {
        return 0.0;
    }
    let n = n as f64;
    const EULER: f64 = 0.577_215_664_901_532_9;
    2.0 * ((n - 1.0).ln() + EULER) - 2.0 * (n - 1.0) / n
}
