//! Differential feature discovery: statistical ranking of learned feature
//! activations by group separation, and motif extraction at the
//! peak-activation positions of the top discriminative features.
use crate::plot::feature_distribution_plot;
use crate::stats::{mann_whitney_u, mean, percentile};
use anyhow::{anyhow, Result};
use itertools::Itertools;
use log::info;
use ndarray::{Array2, Array3, ArrayView1};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// How many top-activating sequences represent each feature.
const TOP_SEQ: usize = 10;
/// Filler appended when a sequence is shorter than the motif window.
const FILLER: char = 'x';

/// One row of the ranked differential feature table.
#[derive(Clone, Debug, Serialize)]
pub struct DiffFeatureRow {
    pub feature: usize,
    pub p_val: f64,
    pub pos_mean: f64,
    pub neg_mean: f64,
    /// `pos_mean - neg_mean`; only positive magnitudes get motifs.
    pub magnitude: f64,
}

/// Wide motif table: one column of top-activating sequences per retained
/// positive feature.
#[derive(Clone, Debug, Default)]
pub struct MotifTable {
    pub features: Vec<usize>,
    pub top_sequences: Vec<Vec<String>>,
}

impl MotifTable {
    pub fn to_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        if self.features.is_empty() {
            writer.flush()?;
            return Ok(());
        }
        writer.write_record(self.features.iter().map(|f| f.to_string()))?;
        let depth = self
            .top_sequences
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0);
        for row in 0..depth {
            writer.write_record(
                self.top_sequences
                    .iter()
                    .map(|col| col.get(row).map(String::as_str).unwrap_or("")),
            )?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Everything one analyzer run produces in memory; the filesystem artifacts
/// land under the run's motif directory.
#[derive(Clone, Debug)]
pub struct DiffResult {
    pub table: Vec<DiffFeatureRow>,
    pub motifs: MotifTable,
    /// Where the artifacts of this run were written.
    pub directory: PathBuf,
}

/// Per-sequence analyzer settings.
#[derive(Clone, Debug)]
pub struct DiffOptions<'a> {
    pub p_val_threshold: f64,
    /// Motif window width (the convolutional kernel size).
    pub kernel: usize,
    /// Average activations per sample before testing.
    pub sample_avg: bool,
    /// Label-group name, used in the artifact directory name.
    pub group: &'a str,
    /// Chain/analysis tag, used in the artifact directory name.
    pub kind: &'a str,
}

/// Witness-function analyzer settings.
#[derive(Clone, Debug)]
pub struct WitnessDiffOptions<'a> {
    pub p_val_threshold: f64,
    pub kernel: usize,
    /// Percentile (0-100) of a feature's activations marking the
    /// high-activation cutoff.
    pub cut: f64,
    /// Render per-feature distribution images.
    pub save_images: bool,
    pub group: &'a str,
    pub kind: &'a str,
}

fn masked(column: ArrayView1<f64>, mask: &[bool]) -> Vec<f64> {
    column
        .iter()
        .zip(mask)
        .filter(|(_, &m)| m)
        .map(|(&v, _)| v)
        .collect()
}

/// Group the masked rows of one feature column by sample id and average
/// within each sample.
fn sample_averaged(column: ArrayView1<f64>, mask: &[bool], sample_id: &[String]) -> Vec<f64> {
    let mut per_sample: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for ((&v, &m), id) in column.iter().zip(mask).zip(sample_id) {
        if m {
            per_sample.entry(id.as_str()).or_default().push(v);
        }
    }
    per_sample.values().map(|vs| mean(vs)).collect()
}

/// Rank every feature column by Mann-Whitney separation between the
/// positive and negative groups. A failed test (degenerate input) is
/// absorbed as p = 1.0, so the feature simply misses the significance
/// cutoff. Rows with p below the threshold are returned sorted by
/// magnitude, descending.
fn rank_features(
    features: &Array2<f64>,
    idx_pos: &[bool],
    idx_neg: &[bool],
    sample_id: Option<&[String]>,
    sample_avg: bool,
    p_val_threshold: f64,
) -> Vec<DiffFeatureRow> {
    let mut table = Vec::new();
    for (feature, column) in features.columns().into_iter().enumerate() {
        let (pos, neg) = match (sample_avg, sample_id) {
            (true, Some(ids)) => (
                sample_averaged(column, idx_pos, ids),
                sample_averaged(column, idx_neg, ids),
            ),
            _ => (masked(column, idx_pos), masked(column, idx_neg)),
        };
        let pos_mean = mean(&pos);
        let neg_mean = mean(&neg);
        let p_val = mann_whitney_u(&pos, &neg).map(|(_, p)| p).unwrap_or(1.0);
        table.push(DiffFeatureRow {
            feature,
            p_val,
            pos_mean,
            neg_mean,
            magnitude: pos_mean - neg_mean,
        });
    }
    table.retain(|row| row.p_val < p_val_threshold);
    table.sort_by(|a, b| {
        b.magnitude
            .partial_cmp(&a.magnitude)
            .unwrap_or(Ordering::Equal)
    });
    table
}

/// Indices of the top rows of one feature column, activation descending.
fn argsort_desc(column: ArrayView1<f64>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..column.len()).collect();
    order.sort_by(|&a, &b| column[b].partial_cmp(&column[a]).unwrap_or(Ordering::Equal));
    order
}

/// The fixed-width window at the peak-activation position, lower-cased and
/// right-padded with the filler when the sequence runs out.
fn motif_at(seq: &str, peak: usize, kernel: usize) -> String {
    let start = peak.min(seq.len());
    let end = (start + kernel).min(seq.len());
    let mut motif = seq[start..end].to_lowercase();
    while motif.len() < kernel {
        motif.push(FILLER);
    }
    motif
}

/// Destructively clear and recreate one analyzer output directory, so a run
/// never inherits stale artifacts from a previous analysis.
fn reset_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

fn write_motif_fasta(dir: &Path, feature: usize, motifs: &[String]) -> Result<()> {
    let path = dir.join(format!("feature_{feature}.fasta"));
    let mut writer = bio::io::fasta::Writer::to_file(path)?;
    for (ii, motif) in motifs.iter().enumerate() {
        writer.write(&ii.to_string(), None, motif.as_bytes())?;
    }
    Ok(())
}

fn write_table_csv(dir: &Path, table: &[DiffFeatureRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(dir.join("differential_features.csv"))?;
    for row in table {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Motif extraction shared by both analyzer variants: for every retained
/// feature with positive magnitude, take the `TOP_SEQ` highest-activating
/// sequences, cut the motif window at each recorded peak position and write
/// the collection as one FASTA file per feature.
fn extract_motifs(
    table: &[DiffFeatureRow],
    features: &Array2<f64>,
    indices: &Array2<usize>,
    sequences: &[String],
    kernel: usize,
    dir: &Path,
    mut on_feature: impl FnMut(usize, ArrayView1<f64>) -> Result<()>,
) -> Result<MotifTable> {
    let mut motifs = MotifTable::default();
    for row in table {
        if row.magnitude <= 0.0 {
            continue;
        }
        let column = features.column(row.feature);
        on_feature(row.feature, column)?;

        let sel: Vec<usize> = argsort_desc(column).into_iter().take(TOP_SEQ).collect();
        let seq_sel: Vec<String> = sel.iter().map(|&i| sequences[i].clone()).collect();
        let windows: Vec<String> = sel
            .iter()
            .zip(&seq_sel)
            .map(|(&i, seq)| motif_at(seq, indices[[i, row.feature]], kernel))
            .collect();
        write_motif_fasta(dir, row.feature, &windows)?;

        motifs.features.push(row.feature);
        motifs.top_sequences.push(seq_sel);
    }
    Ok(motifs)
}

/// Per-sequence differential feature analysis.
///
/// `idx_pos`/`idx_neg` are boolean row masks over `features`. With
/// `sample_avg` set, activations are averaged per sample id before testing
/// so each sample contributes one value per group; requesting it without
/// providing `sample_id` is an error. Artifacts are written under
/// `{group}_{kind}_Motifs` inside `directory_results`, which is cleared
/// first.
#[allow(clippy::too_many_arguments)]
pub fn diff_features(
    features: &Array2<f64>,
    indices: &Array2<usize>,
    sequences: &[String],
    sample_id: Option<&[String]>,
    idx_pos: &[bool],
    idx_neg: &[bool],
    opts: &DiffOptions,
    directory_results: &Path,
) -> Result<DiffResult> {
    if opts.sample_avg && sample_id.is_none() {
        return Err(anyhow!("sample averaging requested without sample ids"));
    }
    let table = rank_features(
        features,
        idx_pos,
        idx_neg,
        sample_id,
        opts.sample_avg,
        opts.p_val_threshold,
    );
    info!(
        "group {}: {} significant features ({})",
        opts.group,
        table.len(),
        opts.kind
    );

    let dir = directory_results.join(format!("{}_{}_Motifs", opts.group, opts.kind));
    reset_dir(&dir)?;
    write_table_csv(&dir, &table)?;

    let motifs = extract_motifs(
        &table,
        features,
        indices,
        sequences,
        opts.kernel,
        &dir,
        |_, _| Ok(()),
    )?;

    Ok(DiffResult {
        table,
        motifs,
        directory: dir,
    })
}

/// Witness-function differential feature analysis.
///
/// `features_wf` holds one row per sample (already aggregated, no grouping
/// step); `features_seq`, `indices`, `sequences` and `freq` hold the
/// underlying per-sequence view, (samples, sequences-per-sample, ...).
/// Beyond the shared ranking/motif pass, each retained feature gets a
/// percentile activation cutoff, and optionally one distribution image
/// comparing the frequency-weighted fraction of high-activation sequences
/// across label groups. The wide motif table is also persisted as
/// `feature_sequences.csv`.
#[allow(clippy::too_many_arguments)]
pub fn diff_features_witness(
    features_wf: &Array2<f64>,
    features_seq: &Array3<f64>,
    indices: &Array3<usize>,
    sequences: &[Vec<String>],
    freq: &Array2<f64>,
    sample_labels: &[String],
    classes: &[String],
    idx_pos: &[bool],
    idx_neg: &[bool],
    opts: &WitnessDiffOptions,
    directory_results: &Path,
) -> Result<DiffResult> {
    let table = rank_features(
        features_wf,
        idx_pos,
        idx_neg,
        None,
        false,
        opts.p_val_threshold,
    );
    info!(
        "group {}: {} significant witness features ({})",
        opts.group,
        table.len(),
        opts.kind
    );

    let (n_samples, per_sample, n_features) = features_seq.dim();
    let flat_features = features_seq
        .to_shape((n_samples * per_sample, n_features))?
        .to_owned();
    let flat_indices = indices
        .to_shape((n_samples * per_sample, n_features))?
        .to_owned();
    let flat_sequences: Vec<String> = sequences.iter().flatten().cloned().collect_vec();

    let dir = directory_results.join(format!("{}_{}_WF_Motifs", opts.group, opts.kind));
    reset_dir(&dir)?;
    write_table_csv(&dir, &table)?;

    let mut cutoffs: Vec<(usize, f64)> = Vec::new();
    let motifs = extract_motifs(
        &table,
        &flat_features,
        &flat_indices,
        &flat_sequences,
        opts.kernel,
        &dir,
        |feature, column| {
            let values = column.to_vec();
            let cutoff = percentile(&values, opts.cut)?;
            cutoffs.push((feature, cutoff));
            Ok(())
        },
    )?;
    motifs.to_csv(&dir.join("feature_sequences.csv"))?;

    if opts.save_images {
        for &(feature, cutoff) in &cutoffs {
            let mut groups: Vec<(String, Vec<f64>)> = Vec::new();
            for class in classes {
                let mut values = Vec::new();
                for (s, label) in sample_labels.iter().enumerate() {
                    if label != class {
                        continue;
                    }
                    // frequency-weighted fraction of high-activation sequences
                    let mut contribution = 0.0;
                    for j in 0..per_sample {
                        if features_seq[[s, j, feature]] > cutoff {
                            contribution += freq[[s, j]];
                        }
                    }
                    values.push(contribution);
                }
                groups.push((class.clone(), values));
            }
            feature_distribution_plot(
                &dir.join(format!("feature{feature}.png")),
                &format!("Feature {feature}"),
                &groups,
            )?;
        }
    }

    Ok(DiffResult {
        table,
        motifs,
        directory: dir,
    })
}
