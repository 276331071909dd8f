use rustc_hash::FxHashMap;

/////////////
// Metrics //
/////////////

/// Fraction of predictions that match the truth
///
/// ### Params
///
/// * `predicted` - Predicted class per sample
/// * `truth` - True class per sample
///
/// ### Returns
///
/// Accuracy in `[0, 1]`. Returns `0.0` for empty input.
pub fn accuracy(predicted: &[usize], truth: &[usize]) -> f64 {
    assert!(
        predicted.len() == truth.len(),
        "Predictions and truth need to have same len!"
    );

    if truth.is_empty() {
        return 0.0;
    }

    let hits = predicted
        .iter()
        .zip(truth.iter())
        .filter(|(p, t)| p == t)
        .count();

    hits as f64 / truth.len() as f64
}

/// Number of points assigned to each cluster
///
/// ### Params
///
/// * `labels` - Cluster index per point
/// * `k` - Number of clusters
///
/// ### Returns
///
/// Vector of length `k` with the cluster sizes
pub fn cluster_sizes(labels: &[usize], k: usize) -> Vec<usize> {
    let mut counts = vec![0usize; k];
    for &label in labels {
        counts[label] += 1;
    }
    counts
}

/// Cluster purity against known classes
///
/// Each cluster is credited with the size of its majority class; purity is
/// the credited total over the number of points. Lets an unsupervised
/// clustering be scored against the labels that generated the data.
///
/// ### Params
///
/// * `labels` - Cluster index per point
/// * `classes` - True class per point
///
/// ### Returns
///
/// Purity in `[0, 1]`. Returns `0.0` for empty input.
pub fn cluster_purity(labels: &[usize], classes: &[usize]) -> f64 {
    assert!(
        labels.len() == classes.len(),
        "Labels and classes need to have same len!"
    );

    if labels.is_empty() {
        return 0.0;
    }

    let mut contingency: FxHashMap<usize, FxHashMap<usize, usize>> = FxHashMap::default();
    for (&label, &class) in labels.iter().zip(classes.iter()) {
        *contingency
            .entry(label)
            .or_default()
            .entry(class)
            .or_insert(0) += 1;
    }

    let majority_total: usize = contingency
        .values()
        .map(|class_counts| class_counts.values().copied().max().unwrap_or(0))
        .sum();

    majority_total as f64 / labels.len() as f64
}

/// Map every cluster to the class most of its members belong to
///
/// ### Params
///
/// * `labels` - Cluster index per point
/// * `classes` - True class per point
/// * `k` - Number of clusters
///
/// ### Returns
///
/// Vector of length `k`; `None` for clusters without members
pub fn majority_class_per_cluster(
    labels: &[usize],
    classes: &[usize],
    k: usize,
) -> Vec<Option<usize>> {
    let mut contingency: Vec<FxHashMap<usize, usize>> = vec![FxHashMap::default(); k];
    for (&label, &class) in labels.iter().zip(classes.iter()) {
        *contingency[label].entry(class).or_insert(0) += 1;
    }

    contingency
        .into_iter()
        .map(|class_counts| {
            // lowest class wins ties so the mapping is reproducible
            class_counts
                .into_iter()
                .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
                .map(|(class, _)| class)
        })
        .collect()
}

///////////
// Tests //
///////////
