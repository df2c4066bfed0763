//! CART regression tree

use crate::error::{ForecastError, Result};
use crate::features::{FeatureVector, TrainingSet, FEATURE_COUNT};
use meal_math::BootstrapSampler;
use rand::rngs::StdRng;

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    /// Maximum depth; a depth-0 tree is a single leaf
    pub max_depth: usize,
    /// Minimum samples on each side of a split
    pub min_samples_leaf: usize,
    /// Candidate features per split
    pub max_features: usize,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Regression tree grown by variance reduction
#[derive(Debug, Clone)]
pub struct RegressionTree {
    root: Node,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    sse: f64,
}

impl RegressionTree {
    /// Grow a tree on the samples at `indices` (repeats allowed)
    pub fn fit(
        samples: &TrainingSet,
        indices: &[usize],
        params: TreeParams,
        rng: &mut StdRng,
    ) -> Result<Self> {
        if indices.is_empty() {
            return Err(ForecastError::DataError(
                "Cannot grow a tree without samples".to_string(),
            ));
        }
        if params.min_samples_leaf == 0 {
            return Err(ForecastError::InvalidParameter(
                "min_samples_leaf must be positive".to_string(),
            ));
        }
        if params.max_features == 0 || params.max_features > FEATURE_COUNT {
            return Err(ForecastError::InvalidParameter(format!(
                "max_features must be between 1 and {}",
                FEATURE_COUNT
            )));
        }

        let mut indices = indices.to_vec();
        let root = grow(samples, &mut indices, 0, &params, rng)?;
        Ok(Self { root })
    }

    /// Predict one vector
    pub fn predict(&self, features: &FeatureVector) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if features.get(*feature) <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    /// Depth of the deepest leaf
    pub fn depth(&self) -> usize {
        fn depth_of(node: &Node) -> usize {
            match node {
                Node::Leaf(_) => 0,
                Node::Split { left, right, .. } => 1 + depth_of(left).max(depth_of(right)),
            }
        }
        depth_of(&self.root)
    }
}

fn grow(
    samples: &TrainingSet,
    indices: &mut [usize],
    depth: usize,
    params: &TreeParams,
    rng: &mut StdRng,
) -> Result<Node> {
    let n = indices.len();
    let mean = indices.iter().map(|&i| samples.targets[i]).sum::<f64>() / n as f64;

    let constant = indices
        .iter()
        .all(|&i| (samples.targets[i] - mean).abs() < f64::EPSILON);
    if depth >= params.max_depth || n < 2 * params.min_samples_leaf || constant {
        return Ok(Node::Leaf(mean));
    }

    let candidates: Vec<usize> = if params.max_features >= FEATURE_COUNT {
        (0..FEATURE_COUNT).collect()
    } else {
        BootstrapSampler::choose_features(rng, FEATURE_COUNT, params.max_features)?
    };

    let parent_sse = sse(indices.iter().map(|&i| samples.targets[i]));
    let Some(best) = best_split(samples, indices, &candidates, params.min_samples_leaf) else {
        return Ok(Node::Leaf(mean));
    };
    if parent_sse - best.sse <= 1e-9 {
        return Ok(Node::Leaf(mean));
    }

    // partition in place: left side holds values <= threshold
    let mut split_at = 0;
    for k in 0..n {
        if samples.features[indices[k]].get(best.feature) <= best.threshold {
            indices.swap(k, split_at);
            split_at += 1;
        }
    }
    if split_at == 0 || split_at == n {
        return Ok(Node::Leaf(mean));
    }

    let (left_idx, right_idx) = indices.split_at_mut(split_at);
    let left = grow(samples, left_idx, depth + 1, params, rng)?;
    let right = grow(samples, right_idx, depth + 1, params, rng)?;

    Ok(Node::Split {
        feature: best.feature,
        threshold: best.threshold,
        left: Box::new(left),
        right: Box::new(right),
    })
}

fn best_split(
    samples: &TrainingSet,
    indices: &[usize],
    candidates: &[usize],
    min_leaf: usize,
) -> Option<SplitCandidate> {
    let n = indices.len();
    let mut best: Option<SplitCandidate> = None;
    let mut order = indices.to_vec();

    for &feature in candidates {
        let x = |i: usize| samples.features[i].get(feature);
        order.sort_by(|&a, &b| x(a).total_cmp(&x(b)));

        let total_sum: f64 = order.iter().map(|&i| samples.targets[i]).sum();
        let total_sq: f64 = order.iter().map(|&i| samples.targets[i].powi(2)).sum();

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for left_len in 1..n {
            let y = samples.targets[order[left_len - 1]];
            left_sum += y;
            left_sq += y * y;

            let right_len = n - left_len;
            if left_len < min_leaf || right_len < min_leaf {
                continue;
            }
            let lo = x(order[left_len - 1]);
            let hi = x(order[left_len]);
            if lo >= hi {
                continue;
            }

            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let split_sse = (left_sq - left_sum * left_sum / left_len as f64)
                + (right_sq - right_sum * right_sum / right_len as f64);

            if best.as_ref().map_or(true, |b| split_sse < b.sse) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: lo + (hi - lo) / 2.0,
                    sse: split_sse,
                });
            }
        }
    }

    best
}

fn sse(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let (count, sum) = values.clone().fold((0usize, 0.0), |(c, s), v| (c + 1, s + v));
    if count == 0 {
        return 0.0;
    }
    let mean = sum / count as f64;
    values.map(|v| (v - mean).powi(2)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::SeedableRng;

    fn step_data() -> TrainingSet {
        let mut set = TrainingSet::default();
        for i in 0..20 {
            let mut v = [0.0; FEATURE_COUNT];
            v[8] = i as f64;
            set.dates
                .push(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i));
            set.features.push(FeatureVector(v));
            set.targets.push(if i < 10 { 100.0 } else { 300.0 });
        }
        set
    }

    fn params(max_depth: usize) -> TreeParams {
        TreeParams {
            max_depth,
            min_samples_leaf: 1,
            max_features: FEATURE_COUNT,
        }
    }

    #[test]
    fn learns_a_step() {
        let data = step_data();
        let indices: Vec<usize> = (0..data.len()).collect();
        let mut rng = StdRng::seed_from_u64(0);
        let tree = RegressionTree::fit(&data, &indices, params(4), &mut rng).unwrap();

        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict(&data.features[2]), 100.0);
        assert_eq!(tree.predict(&data.features[15]), 300.0);
    }

    #[test]
    fn depth_zero_is_the_mean() {
        let data = step_data();
        let indices: Vec<usize> = (0..data.len()).collect();
        let mut rng = StdRng::seed_from_u64(0);
        let tree = RegressionTree::fit(&data, &indices, params(0), &mut rng).unwrap();
        assert_eq!(tree.predict(&data.features[0]), 200.0);
    }

    #[test]
    fn rejects_bad_params() {
        let data = step_data();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(RegressionTree::fit(&data, &[], params(3), &mut rng).is_err());
        let bad = TreeParams {
            max_features: 0,
            ..params(3)
        };
        assert!(RegressionTree::fit(&data, &[0, 1], bad, &mut rng).is_err());
    }
}
