//! Train/valid/test partitioning along the sample axis.
use crate::channels::DataSet;
use crate::utils::decode_labels;
use ndarray::Array2;
use rand::seq::SliceRandom;
use rand::Rng;

/// Disjoint index sets for the three partitions. Their union is the full
/// index set (stratified modes); in leave-N-out mode the valid and test
/// sets are the same held-out draw.
#[derive(Clone, Debug, Default)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub valid: Vec<usize>,
    pub test: Vec<usize>,
}

/// The three partitions of a `DataSet`.
#[derive(Clone, Debug)]
pub struct Split {
    pub train: DataSet,
    pub valid: DataSet,
    pub test: DataSet,
}

/// Partition `0..n` according to the label array.
///
/// With `loo = Some(k)`, k indices are drawn without replacement as the
/// held-out test set (which doubles as the validation set) and the train
/// set is the complement. Otherwise the split is stratified per class
/// (classification) or performed once over the whole range (regression):
/// each stratum is shuffled, `(1 - test_size)` of it goes to train and the
/// remainder is halved into valid/test with a floor midpoint, concatenating
/// strata in ascending class order.
///
/// An empty train split (`test_size` close to 1, or `loo >= n`) is a caller
/// error and is not guarded here.
pub fn split_indices<R: Rng>(
    labels: &Array2<f64>,
    test_size: f64,
    regression: bool,
    loo: Option<usize>,
    rng: &mut R,
) -> SplitIndices {
    let n = labels.nrows();

    if let Some(k) = loo {
        let mut idx: Vec<usize> = (0..n).collect();
        idx.shuffle(rng);
        let test: Vec<usize> = idx[..k].to_vec();
        let mut train: Vec<usize> = idx[k..].to_vec();
        train.sort_unstable();
        return SplitIndices {
            train,
            valid: test.clone(),
            test,
        };
    }

    let mut out = SplitIndices::default();
    if regression {
        let mut idx: Vec<usize> = (0..n).collect();
        idx.shuffle(rng);
        split_stratum(&idx, test_size, &mut out);
        return out;
    }

    // one stratum per class, ascending class order
    let y_label = decode_labels(labels);
    let mut classes: Vec<usize> = y_label.clone();
    classes.sort_unstable();
    classes.dedup();

    for class in classes {
        let mut idx: Vec<usize> = (0..n).filter(|&i| y_label[i] == class).collect();
        idx.shuffle(rng);
        split_stratum(&idx, test_size, &mut out);
    }
    out
}

fn split_stratum(shuffled: &[usize], test_size: f64, out: &mut SplitIndices) {
    let n_train = ((1.0 - test_size) * shuffled.len() as f64) as usize;
    let rest = &shuffled[n_train..];
    let half = rest.len() / 2;
    out.train.extend_from_slice(&shuffled[..n_train]);
    out.valid.extend_from_slice(&rest[..half]);
    out.test.extend_from_slice(&rest[half..]);
}

/// Stratified or leave-N-out partition of a full `DataSet`.
pub fn train_valid_test<R: Rng>(
    set: &DataSet,
    test_size: f64,
    regression: bool,
    loo: Option<usize>,
    rng: &mut R,
) -> Split {
    let idx = split_indices(&set.labels, test_size, regression, loo, rng);
    Split {
        train: set.select(&idx.train),
        valid: set.select(&idx.valid),
        test: set.select(&idx.test),
    }
}

/// Split a `DataSet` along caller-chosen index sets (cross-validation folds
/// computed elsewhere).
pub fn split_by_indices(set: &DataSet, train_idx: &[usize], test_idx: &[usize]) -> (DataSet, DataSet) {
    (set.select(train_idx), set.select(test_idx))
}
