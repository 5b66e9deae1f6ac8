//! Small shared helpers: categorical encoding, label decoding, padding.
use anyhow::{anyhow, Result};
use ndarray::Array2;

/// Sentinel used when padding a sample's sequence list to a fixed size.
pub const NULL_SEQUENCE: &str = "null";

/// Sorted-unique categorical encoder for string identifiers. Codes follow
/// lexicographic order of the distinct values, so two encoders fit on the
/// same value set always agree.
#[derive(Clone, Debug, Default)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit(values: &[String]) -> LabelEncoder {
        let mut classes: Vec<String> = values.to_vec();
        classes.sort();
        classes.dedup();
        LabelEncoder { classes }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn encode(&self, value: &str) -> Result<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(value))
            .map_err(|_| anyhow!("unknown category: {value}"))
    }

    pub fn transform(&self, values: &[String]) -> Result<Vec<usize>> {
        values.iter().map(|v| self.encode(v)).collect()
    }
}

/// Integer-decode one-hot labels (argmax along axis 1).
pub fn decode_labels(labels: &Array2<f64>) -> Vec<usize> {
    labels
        .rows()
        .into_iter()
        .map(|row| {
            let mut best = 0;
            for (j, &v) in row.iter().enumerate() {
                if v > row[best] {
                    best = j;
                }
            }
            best
        })
        .collect()
}

/// Truncate or right-pad each sample's sequence list to exactly
/// `per_instance` entries, filling with the `"null"` sentinel.
pub fn pad_sequences(sequences: &mut [Vec<String>], per_instance: usize) {
    for sample in sequences.iter_mut() {
        if sample.len() > per_instance {
            sample.truncate(per_instance);
        } else {
            sample.resize(per_instance, NULL_SEQUENCE.to_string());
        }
    }
}

/// Truncate or zero-pad each sample's frequency vector to exactly
/// `per_instance` entries.
pub fn pad_freq(freq: &mut [Vec<f64>], per_instance: usize) {
    for sample in freq.iter_mut() {
        if sample.len() > per_instance {
            sample.truncate(per_instance);
        } else {
            sample.resize(per_instance, 0.0);
        }
    }
}
