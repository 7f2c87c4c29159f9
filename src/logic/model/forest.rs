//! Random forest classifier
//!
//! Trees are stored pre-order with explicit child indices. A sample goes left
//! when `x[feature] <= threshold`. Forest probability is the mean of the
//! normalized leaf distributions; `predict` is its argmax.

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

use super::artifact::{ForestParams, TreeNode, TreeParams};
use super::classifier::{argmax, check_width, ClassLabel, Classifier, InferenceError};
use crate::error::ArtifactLoadError;

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf(Vec<f64>),
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn build(
        index: usize,
        params: &TreeParams,
        n_features: usize,
        n_classes: usize,
    ) -> Result<Self, ArtifactLoadError> {
        let invalid = |node: usize, msg: String| {
            ArtifactLoadError::invalid(format!("tree {} node {}: {}", index, node, msg))
        };

        if params.nodes.is_empty() {
            return Err(ArtifactLoadError::invalid(format!("tree {} has no nodes", index)));
        }

        let len = params.nodes.len();
        let mut nodes = Vec::with_capacity(len);

        for (i, raw) in params.nodes.iter().enumerate() {
            let node = match raw {
                TreeNode { feature: Some(feature), left: Some(left), right: Some(right), threshold, .. } => {
                    if *feature >= n_features {
                        return Err(invalid(i, format!("feature {} out of range", feature)));
                    }
                    // Pre-order: children always come after the parent, so traversal terminates
                    if *left <= i || *right <= i || *left >= len || *right >= len {
                        return Err(invalid(i, "child index out of order".to_string()));
                    }
                    if !threshold.is_finite() {
                        return Err(invalid(i, "non-finite threshold".to_string()));
                    }
                    Node::Split {
                        feature: *feature,
                        threshold: *threshold,
                        left: *left,
                        right: *right,
                    }
                }
                TreeNode { feature: None, left: None, right: None, value, .. } => {
                    Node::Leaf(normalize_leaf(value, n_classes).map_err(|msg| invalid(i, msg))?)
                }
                _ => return Err(invalid(i, "split nodes need feature, left and right".to_string())),
            };
            nodes.push(node);
        }

        Ok(Self { nodes })
    }

    fn leaf(&self, row: ArrayView1<'_, f64>) -> &[f64] {
        let mut at = 0;
        loop {
            match &self.nodes[at] {
                Node::Split { feature, threshold, left, right } => {
                    at = if row[*feature] <= *threshold { *left } else { *right };
                }
                Node::Leaf(dist) => return dist,
            }
        }
    }
}

fn normalize_leaf(value: &[f64], n_classes: usize) -> Result<Vec<f64>, String> {
    if value.len() != n_classes {
        return Err(format!("leaf has {} values for {} classes", value.len(), n_classes));
    }
    if value.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err("leaf values must be finite and non-negative".to_string());
    }

    let total: f64 = value.iter().sum();
    if total <= 0.0 {
        return Err("leaf carries no weight".to_string());
    }
    Ok(value.iter().map(|v| v / total).collect())
}

#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<Tree>,
    classes: Vec<ClassLabel>,
    n_features: usize,
}

impl RandomForest {
    pub fn from_params(
        params: &ForestParams,
        classes: Vec<ClassLabel>,
        n_features: usize,
    ) -> Result<Self, ArtifactLoadError> {
        if params.trees.is_empty() {
            return Err(ArtifactLoadError::invalid("forest has no trees"));
        }
        if classes.len() < 2 {
            return Err(ArtifactLoadError::invalid("forest needs at least two classes"));
        }

        let trees = params
            .trees
            .iter()
            .enumerate()
            .map(|(i, t)| Tree::build(i, t, n_features, classes.len()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { trees, classes, n_features })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn probabilities(&self, batch: ArrayView2<'_, f64>) -> Result<Array2<f64>, InferenceError> {
        check_width(&batch, self.n_features)?;

        let mut proba = Array2::<f64>::zeros((batch.nrows(), self.classes.len()));
        for (row, mut out) in batch.axis_iter(Axis(0)).zip(proba.axis_iter_mut(Axis(0))) {
            for tree in &self.trees {
                for (acc, p) in out.iter_mut().zip(tree.leaf(row)) {
                    *acc += p;
                }
            }
        }
        proba /= self.trees.len() as f64;
        Ok(proba)
    }
}

impl Classifier for RandomForest {
    fn kind(&self) -> &'static str {
        "random_forest"
    }

    fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }

    fn predict(&self, batch: ArrayView2<'_, f64>) -> Result<Vec<ClassLabel>, InferenceError> {
        let proba = self.probabilities(batch)?;
        proba
            .axis_iter(Axis(0))
            .map(|row| {
                argmax(row.iter().copied())
                    .map(|idx| self.classes[idx].clone())
                    .ok_or_else(|| InferenceError::new("empty probability row"))
            })
            .collect()
    }

    fn predict_proba(&self, batch: ArrayView2<'_, f64>) -> Result<Option<Array2<f64>>, InferenceError> {
        self.probabilities(batch).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn split(feature: usize, threshold: f64, left: usize, right: usize) -> TreeNode {
        TreeNode {
            feature: Some(feature),
            threshold,
            left: Some(left),
            right: Some(right),
            value: vec![],
        }
    }

    fn leaf(value: Vec<f64>) -> TreeNode {
        TreeNode { value, ..Default::default() }
    }

    fn classes() -> Vec<ClassLabel> {
        vec![ClassLabel::from("HIGH"), ClassLabel::from("LOW"), ClassLabel::from("MEDIUM")]
    }

    /// x0 <= 30 → LOW-ish, else HIGH-ish
    fn forest() -> RandomForest {
        let a = TreeParams {
            nodes: vec![split(0, 30.0, 1, 2), leaf(vec![0.0, 8.0, 2.0]), leaf(vec![6.0, 0.0, 4.0])],
        };
        let b = TreeParams {
            nodes: vec![split(0, 35.0, 1, 2), leaf(vec![1.0, 3.0, 0.0]), leaf(vec![1.0, 0.0, 0.0])],
        };
        RandomForest::from_params(&ForestParams { trees: vec![a, b] }, classes(), 2).unwrap()
    }

    #[test]
    fn test_mean_of_leaf_distributions() {
        let proba = forest().predict_proba(array![[10.0, 0.0]].view()).unwrap().unwrap();
        // tree a: [0, .8, .2]; tree b: [.25, .75, 0]
        assert!((proba[[0, 0]] - 0.125).abs() < 1e-12);
        assert!((proba[[0, 1]] - 0.775).abs() < 1e-12);
        assert!((proba[[0, 2]] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_threshold_goes_left_when_equal() {
        let labels = forest().predict(array![[30.0, 0.0], [40.0, 0.0]].view()).unwrap();
        assert_eq!(labels, vec![ClassLabel::from("LOW"), ClassLabel::from("HIGH")]);
    }

    #[test]
    fn test_rejects_backward_child() {
        let bad = TreeParams { nodes: vec![split(0, 1.0, 0, 1), leaf(vec![1.0, 0.0, 0.0])] };
        assert!(RandomForest::from_params(&ForestParams { trees: vec![bad] }, classes(), 1).is_err());
    }

    #[test]
    fn test_rejects_feature_out_of_range() {
        let bad = TreeParams {
            nodes: vec![split(5, 1.0, 1, 2), leaf(vec![1.0, 0.0, 0.0]), leaf(vec![0.0, 1.0, 0.0])],
        };
        assert!(RandomForest::from_params(&ForestParams { trees: vec![bad] }, classes(), 2).is_err());
    }

    #[test]
    fn test_rejects_wrong_leaf_width() {
        let bad = TreeParams { nodes: vec![leaf(vec![1.0, 0.0])] };
        assert!(RandomForest::from_params(&ForestParams { trees: vec![bad] }, classes(), 2).is_err());
    }

    #[test]
    fn test_single_leaf_tree() {
        let stump = TreeParams { nodes: vec![leaf(vec![0.0, 0.0, 2.0])] };
        let model = RandomForest::from_params(&ForestParams { trees: vec![stump] }, classes(), 2).unwrap();
        assert_eq!(model.n_trees(), 1);
        assert_eq!(model.predict(array![[0.0, 0.0]].view()).unwrap(), vec![ClassLabel::from("MEDIUM")]);
    }
}
