//! Epoch drivers: batched forward/backward passes over the trainable graph,
//! in per-sequence and per-sample (witness-function) modes, plus the
//! inference-only feature extractor.
use crate::batch::{batches, batches_ordered};
use crate::channels::{ChannelSet, DataSet, RepertoireData, SampleSet};
use crate::graph::{Chain, Feed, SparseIndicator, StepOutput, TrainableGraph};
use crate::stats::{mean, roc_auc};
use crate::utils::LabelEncoder;
use anyhow::{anyhow, Result};
use log::debug;
use ndarray::{concatenate, Array1, Array2, Axis};
use rand::Rng;

/// How one epoch is driven.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct RunConfig {
    pub batch_size: usize,
    /// Draw a fresh random batch order for this epoch.
    pub shuffle: bool,
    /// Execute the optimizer step alongside the forward pass.
    pub train: bool,
    /// Dropout keep probability, fed through when set.
    pub dropout_keep: Option<f64>,
}

/// What every epoch runner returns.
///
/// Loss and accuracy are unweighted arithmetic means over batches (the
/// short final batch counts the same as the others). `predicted` stacks
/// per-batch predictions in iteration order, which is the shuffled order
/// when `shuffle` is set; the AUC is computed against the partition labels
/// in their original order and falls back to 0.0 when it cannot be
/// computed (e.g. a single-class partition).
#[derive(Clone, Debug)]
pub struct EpochMetrics {
    pub loss: f64,
    pub accuracy: f64,
    pub predicted: Array2<f64>,
    pub auc: f64,
}

fn finish_epoch(
    labels: &Array2<f64>,
    losses: &[f64],
    accuracies: &[f64],
    predicted: Vec<Array2<f64>>,
) -> Result<EpochMetrics> {
    let predicted = if predicted.is_empty() {
        Array2::zeros((0, labels.ncols()))
    } else {
        let views: Vec<_> = predicted.iter().map(Array2::view).collect();
        concatenate(Axis(0), &views)?
    };
    let auc = roc_auc(labels, &predicted).unwrap_or(0.0);
    let metrics = EpochMetrics {
        loss: mean(losses),
        accuracy: mean(accuracies),
        predicted,
        auc,
    };
    debug!(
        "epoch done: loss={:.4} accuracy={:.4} auc={:.4}",
        metrics.loss, metrics.accuracy, metrics.auc
    );
    Ok(metrics)
}

fn run_step<G: TrainableGraph>(graph: &mut G, feed: &Feed, train: bool) -> Result<StepOutput> {
    if train {
        graph.train_step(feed)
    } else {
        graph.eval_step(feed)
    }
}

/// Drive one epoch over a per-sequence partition. Each batch populates only
/// the active channels plus the labels (and the dropout probability when
/// given); in train mode the optimizer step runs alongside the forward
/// pass.
pub fn run_epoch_sequence<G: TrainableGraph, R: Rng>(
    graph: &mut G,
    set: &DataSet,
    channels: &ChannelSet,
    cfg: &RunConfig,
    rng: &mut R,
) -> Result<EpochMetrics> {
    for c in channels.active() {
        if set.channel(c).is_none() {
            return Err(anyhow!("channel {} is active but has no data", c.name()));
        }
    }

    let order = if cfg.shuffle {
        batches(set.len(), cfg.batch_size, rng)
    } else {
        batches_ordered(set.len(), cfg.batch_size)
    };

    let mut losses = Vec::new();
    let mut accuracies = Vec::new();
    let mut predicted = Vec::new();
    for idx in order {
        let sub = set.select(&idx);
        let feed = Feed {
            channels: sub
                .channels
                .into_iter()
                .filter(|(c, _)| channels.is_active(*c))
                .collect(),
            labels: Some(sub.labels),
            dropout_keep: cfg.dropout_keep,
            freq: None,
            indicator: None,
        };
        let step = run_step(graph, &feed, cfg.train)?;
        losses.push(step.loss);
        accuracies.push(step.accuracy);
        predicted.push(step.predicted);
    }

    finish_epoch(&set.labels, &losses, &accuracies, predicted)
}

/// One witness-function batch, re-keyed by sample identity: the rows of all
/// per-sequence arrays belonging to the batch samples, the batch labels
/// sorted into encoder order, and the sample-membership indicator whose
/// columns follow `var_idx`.
fn witness_feed(
    batch: &SampleSet,
    data: &RepertoireData,
    dropout_keep: Option<f64>,
) -> Result<Feed> {
    let var_idx = data.rows_for_samples(&batch.sample_ids);

    // per-batch encoder so indicator rows align with the sorted sample order
    let lb = LabelEncoder::fit(&batch.sample_ids);
    let position: foldhash::HashMap<&str, usize> = batch
        .sample_ids
        .iter()
        .enumerate()
        .map(|(i, s)| (s.as_str(), i))
        .collect();
    let sample_order: Vec<usize> = lb.classes().iter().map(|c| position[c.as_str()]).collect();
    let sorted = batch.select(&sample_order);

    let owners: Vec<String> = var_idx.iter().map(|&i| data.sample_id[i].clone()).collect();
    let memberships = lb.transform(&owners)?;
    let indicator = SparseIndicator::from_memberships(&memberships, lb.classes().len());

    let mut feed_channels = Vec::new();
    for c in data.channels.active() {
        feed_channels.push((c, data.require(c)?.select(&var_idx)));
    }

    Ok(Feed {
        channels: feed_channels,
        labels: Some(sorted.labels),
        dropout_keep,
        freq: Some(data.freq.select(Axis(0), &var_idx)),
        indicator: Some(indicator),
    })
}

/// Drive one epoch in witness-function mode: batches run over unique sample
/// identifiers, every sequence row of a batch's samples is fed together
/// with its clonal frequency, and the sparse indicator lets the graph pool
/// sequence-level features into sample-level predictions.
pub fn run_epoch_witness<G: TrainableGraph, R: Rng>(
    graph: &mut G,
    set: &SampleSet,
    data: &RepertoireData,
    cfg: &RunConfig,
    rng: &mut R,
) -> Result<EpochMetrics> {
    for c in data.channels.active() {
        data.require(c)?;
    }

    let order = if cfg.shuffle {
        batches(set.len(), cfg.batch_size, rng)
    } else {
        batches_ordered(set.len(), cfg.batch_size)
    };

    let mut losses = Vec::new();
    let mut accuracies = Vec::new();
    let mut predicted = Vec::new();
    for idx in order {
        let batch = set.select(&idx);
        let feed = witness_feed(&batch, data, cfg.dropout_keep)?;
        let step = run_step(graph, &feed, cfg.train)?;
        losses.push(step.loss);
        accuracies.push(step.accuracy);
        predicted.push(step.predicted);
    }

    finish_epoch(&set.labels, &losses, &accuracies, predicted)
}

/// Feature maps and peak-activation positions for one chain, cached for the
/// differential analysis steps.
#[derive(Clone, Debug)]
pub struct FeatureCache {
    pub features: Array2<f64>,
    pub indices: Array2<usize>,
}

/// Per-chain caches harvested by `extract_sequence_features`; a chain that
/// is inactive stays `None`.
#[derive(Clone, Debug, Default)]
pub struct ExtractedFeatures {
    pub alpha: Option<FeatureCache>,
    pub beta: Option<FeatureCache>,
}

impl ExtractedFeatures {
    pub fn chain(&self, chain: Chain) -> Option<&FeatureCache> {
        match chain {
            Chain::Alpha => self.alpha.as_ref(),
            Chain::Beta => self.beta.as_ref(),
        }
    }
}

/// Inference-only pass over the full sequence set (original order, no
/// shuffling) harvesting the convolutional feature maps and their
/// position-of-maximal-activation indices for every active chain.
pub fn extract_sequence_features<G: TrainableGraph>(
    graph: &mut G,
    data: &RepertoireData,
    batch_size: usize,
) -> Result<ExtractedFeatures> {
    let mut chains = Vec::new();
    if data.channels.use_alpha {
        chains.push(Chain::Alpha);
    }
    if data.channels.use_beta {
        chains.push(Chain::Beta);
    }

    let mut per_chain: Vec<(Vec<Array2<f64>>, Vec<Array2<usize>>)> =
        vec![(Vec::new(), Vec::new()); chains.len()];

    for idx in batches_ordered(data.len(), batch_size) {
        let mut feed = Feed::default();
        for chain in &chains {
            feed.channels
                .push((chain.channel(), data.require(chain.channel())?.select(&idx)));
        }
        for (chain, (features, indices)) in chains.iter().zip(per_chain.iter_mut()) {
            let (f, i) = graph.sequence_features(*chain, &feed)?;
            features.push(f);
            indices.push(i);
        }
    }

    let mut out = ExtractedFeatures::default();
    for (chain, (features, indices)) in chains.iter().zip(per_chain) {
        let fviews: Vec<_> = features.iter().map(Array2::view).collect();
        let iviews: Vec<_> = indices.iter().map(Array2::view).collect();
        let cache = FeatureCache {
            features: concatenate(Axis(0), &fviews)?,
            indices: concatenate(Axis(0), &iviews)?,
        };
        match chain {
            Chain::Alpha => out.alpha = Some(cache),
            Chain::Beta => out.beta = Some(cache),
        }
    }
    Ok(out)
}

/// Per-sequence predictions through the witness-function graph: every
/// sequence of the given samples is scored on its own by feeding an
/// identity indicator and unit frequencies. Returns the stacked predictions
/// together with the sequence rows they correspond to, in visit order.
pub fn sequence_predictions<G: TrainableGraph>(
    graph: &mut G,
    set: &SampleSet,
    data: &RepertoireData,
    batch_size: usize,
) -> Result<(Array2<f64>, Vec<usize>)> {
    for c in data.channels.active() {
        data.require(c)?;
    }

    let mut predicted = Vec::new();
    let mut visited = Vec::new();
    for idx in batches_ordered(set.len(), batch_size) {
        let batch = set.select(&idx);
        let var_idx = data.rows_for_samples(&batch.sample_ids);

        let mut feed_channels = Vec::new();
        for c in data.channels.active() {
            feed_channels.push((c, data.require(c)?.select(&var_idx)));
        }
        let feed = Feed {
            channels: feed_channels,
            labels: None,
            dropout_keep: None,
            freq: Some(Array1::ones(var_idx.len())),
            indicator: Some(SparseIndicator::identity(var_idx.len())),
        };
        predicted.push(graph.predict(&feed)?);
        visited.extend(var_idx);
    }

    let views: Vec<_> = predicted.iter().map(Array2::view).collect();
    Ok((concatenate(Axis(0), &views)?, visited))
}
