//! The fixed schema of receptor feature channels and the co-indexed array
//! containers built on top of it.
use anyhow::{anyhow, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// One named input modality of the model.
///
/// The order of `Channel::ALL` is the canonical feed order: sequence
/// channels first, then gene-usage channels (beta before alpha).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    SeqAlpha,
    SeqBeta,
    VBeta,
    DBeta,
    JBeta,
    VAlpha,
    JAlpha,
}

impl Channel {
    pub const ALL: [Channel; 7] = [
        Channel::SeqAlpha,
        Channel::SeqBeta,
        Channel::VBeta,
        Channel::DBeta,
        Channel::JBeta,
        Channel::VAlpha,
        Channel::JAlpha,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Channel::SeqAlpha => "x_seq_alpha",
            Channel::SeqBeta => "x_seq_beta",
            Channel::VBeta => "v_beta",
            Channel::DBeta => "d_beta",
            Channel::JBeta => "j_beta",
            Channel::VAlpha => "v_alpha",
            Channel::JAlpha => "j_alpha",
        }
    }
}

/// Which channels of the fixed schema are active for a given model.
/// Inactive channels are skipped exactly: no placeholder of theirs is
/// ever referenced downstream.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct ChannelSet {
    pub use_alpha: bool,
    pub use_beta: bool,
    pub use_v_beta: bool,
    pub use_d_beta: bool,
    pub use_j_beta: bool,
    pub use_v_alpha: bool,
    pub use_j_alpha: bool,
}

impl ChannelSet {
    pub fn is_active(&self, channel: Channel) -> bool {
        match channel {
            Channel::SeqAlpha => self.use_alpha,
            Channel::SeqBeta => self.use_beta,
            Channel::VBeta => self.use_v_beta,
            Channel::DBeta => self.use_d_beta,
            Channel::JBeta => self.use_j_beta,
            Channel::VAlpha => self.use_v_alpha,
            Channel::JAlpha => self.use_j_alpha,
        }
    }

    /// Active channels in canonical feed order.
    pub fn active(&self) -> Vec<Channel> {
        Channel::ALL
            .iter()
            .copied()
            .filter(|&c| self.is_active(c))
            .collect()
    }
}

/// The array payload of one channel, co-indexed with every other channel
/// along axis 0.
#[derive(Clone, Debug, PartialEq)]
pub enum ChannelData {
    /// Integer-encoded amino-acid sequences, shape (n, max_len).
    Seq(Array2<i64>),
    /// Categorical gene-usage indices, shape (n,).
    Gene(Array1<i64>),
}

impl ChannelData {
    pub fn len(&self) -> usize {
        match self {
            ChannelData::Seq(a) => a.nrows(),
            ChannelData::Gene(a) => a.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take the given rows, in the given order.
    pub fn select(&self, idx: &[usize]) -> ChannelData {
        match self {
            ChannelData::Seq(a) => ChannelData::Seq(a.select(Axis(0), idx)),
            ChannelData::Gene(a) => ChannelData::Gene(a.select(Axis(0), idx)),
        }
    }
}

/// A co-indexed tuple of channel arrays plus the label array (one-hot for
/// classification, scalar columns for regression). Every array shares the
/// same length along axis 0; this is checked once at construction and then
/// assumed everywhere.
#[derive(Clone, Debug)]
pub struct DataSet {
    pub channels: Vec<(Channel, ChannelData)>,
    pub labels: Array2<f64>,
}

impl DataSet {
    pub fn new(channels: Vec<(Channel, ChannelData)>, labels: Array2<f64>) -> DataSet {
        for (c, data) in &channels {
            assert_eq!(
                data.len(),
                labels.nrows(),
                "channel {} is not co-indexed with the labels",
                c.name()
            );
        }
        DataSet { channels, labels }
    }

    pub fn len(&self) -> usize {
        self.labels.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channel(&self, channel: Channel) -> Option<&ChannelData> {
        self.channels
            .iter()
            .find(|(c, _)| *c == channel)
            .map(|(_, data)| data)
    }

    /// Take the given rows of every array, preserving cross-array alignment.
    pub fn select(&self, idx: &[usize]) -> DataSet {
        DataSet {
            channels: self
                .channels
                .iter()
                .map(|(c, data)| (*c, data.select(idx)))
                .collect(),
            labels: self.labels.select(Axis(0), idx),
        }
    }
}

/// The witness-function analogue of `DataSet`: one row per sample, keyed by
/// sample identifier.
#[derive(Clone, Debug)]
pub struct SampleSet {
    pub sample_ids: Vec<String>,
    pub labels: Array2<f64>,
}

impl SampleSet {
    pub fn new(sample_ids: Vec<String>, labels: Array2<f64>) -> SampleSet {
        assert_eq!(
            sample_ids.len(),
            labels.nrows(),
            "sample ids are not co-indexed with the labels"
        );
        SampleSet { sample_ids, labels }
    }

    pub fn len(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sample_ids.is_empty()
    }

    pub fn select(&self, idx: &[usize]) -> SampleSet {
        SampleSet {
            sample_ids: idx.iter().map(|&i| self.sample_ids[i].clone()).collect(),
            labels: self.labels.select(Axis(0), idx),
        }
    }
}

/// The full per-sequence arrays of a repertoire cohort, owned by the
/// orchestrating driver. The witness-function runner indexes into these by
/// sample membership; the extractor scans them front to back.
#[derive(Clone, Debug)]
pub struct RepertoireData {
    pub channels: ChannelSet,
    pub vars: Vec<(Channel, ChannelData)>,
    /// Owning sample of each sequence row.
    pub sample_id: Vec<String>,
    /// Clonal frequency of each sequence within its sample.
    pub freq: Array1<f64>,
}

impl RepertoireData {
    pub fn new(
        channels: ChannelSet,
        vars: Vec<(Channel, ChannelData)>,
        sample_id: Vec<String>,
        freq: Array1<f64>,
    ) -> RepertoireData {
        for (c, data) in &vars {
            assert_eq!(
                data.len(),
                sample_id.len(),
                "channel {} is not co-indexed with the sample ids",
                c.name()
            );
        }
        assert_eq!(sample_id.len(), freq.len());
        RepertoireData {
            channels,
            vars,
            sample_id,
            freq,
        }
    }

    pub fn len(&self) -> usize {
        self.sample_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sample_id.is_empty()
    }

    pub fn channel(&self, channel: Channel) -> Option<&ChannelData> {
        self.vars
            .iter()
            .find(|(c, _)| *c == channel)
            .map(|(_, data)| data)
    }

    /// The active-channel array for `channel`, or an error if the caller
    /// declared it active but never provided it.
    pub fn require(&self, channel: Channel) -> Result<&ChannelData> {
        self.channel(channel)
            .ok_or_else(|| anyhow!("channel {} is active but has no data", channel.name()))
    }

    /// Rows belonging to any of the given samples, in ascending row order.
    pub fn rows_for_samples(&self, samples: &[String]) -> Vec<usize> {
        let wanted: foldhash::HashSet<&str> = samples.iter().map(String::as_str).collect();
        self.sample_id
            .iter()
            .enumerate()
            .filter(|(_, s)| wanted.contains(s.as_str()))
            .map(|(i, _)| i)
            .collect()
    }
}
