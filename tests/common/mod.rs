use anyhow::Result;
use ndarray::{Array1, Array2};
use tcrdiff::{
    Chain, Channel, ChannelData, ChannelSet, DataSet, Feed, RepertoireData, SampleSet, StepOutput,
    TrainableGraph,
};

/// A graph stand-in that echoes the batch labels back as predictions and
/// records every feed it sees, so tests can check what the runners fed it.
#[derive(Default)]
#[allow(dead_code)]
pub struct MockGraph {
    pub train_steps: usize,
    pub eval_steps: usize,
    pub feeds: Vec<Feed>,
}

#[allow(dead_code)]
impl MockGraph {
    fn echo(&mut self, feed: &Feed) -> Result<StepOutput> {
        self.feeds.push(feed.clone());
        let labels = feed
            .labels
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no labels fed"))?;
        Ok(StepOutput {
            loss: 1.0,
            accuracy: 0.5,
            predicted: labels,
        })
    }
}

impl TrainableGraph for MockGraph {
    fn train_step(&mut self, feed: &Feed) -> Result<StepOutput> {
        self.train_steps += 1;
        self.echo(feed)
    }

    fn eval_step(&mut self, feed: &Feed) -> Result<StepOutput> {
        self.eval_steps += 1;
        self.echo(feed)
    }

    fn predict(&mut self, feed: &Feed) -> Result<Array2<f64>> {
        self.feeds.push(feed.clone());
        let rows = feed
            .indicator
            .as_ref()
            .map(|sp| sp.shape.0)
            .unwrap_or_default();
        Ok(Array2::from_elem((rows, 2), 0.5))
    }

    fn sequence_features(
        &mut self,
        chain: Chain,
        feed: &Feed,
    ) -> Result<(Array2<f64>, Array2<usize>)> {
        let data = feed
            .channel(chain.channel())
            .ok_or_else(|| anyhow::anyhow!("chain {} not fed", chain.name()))?;
        let seq = match data {
            ChannelData::Seq(a) => a,
            ChannelData::Gene(_) => anyhow::bail!("sequence channel expected"),
        };
        // feature k of row i is the encoded row sum plus k, so output rows
        // can be traced back to input rows
        let n = seq.nrows();
        let mut features = Array2::zeros((n, 2));
        for (i, row) in seq.rows().into_iter().enumerate() {
            let total: i64 = row.iter().sum();
            for k in 0..2 {
                features[[i, k]] = total as f64 + k as f64;
            }
        }
        let indices = Array2::zeros((n, 2));
        Ok((features, indices))
    }
}

/// Two-class dataset: `n_per_class` rows per class, one encoded beta
/// sequence channel and one row-identifying V-beta gene channel (so tests
/// can track which original rows ended up where).
#[allow(dead_code)]
pub fn two_class_dataset(n_per_class: usize) -> DataSet {
    let n = 2 * n_per_class;
    let seq = Array2::from_shape_fn((n, 3), |(i, j)| (i * 3 + j) as i64);
    let row_id = Array1::from_iter(0..n as i64);
    let labels = Array2::from_shape_fn((n, 2), |(i, j)| {
        if (i < n_per_class) == (j == 0) {
            1.0
        } else {
            0.0
        }
    });
    DataSet::new(
        vec![
            (Channel::SeqBeta, ChannelData::Seq(seq)),
            (Channel::VBeta, ChannelData::Gene(row_id)),
        ],
        labels,
    )
}

/// A small cohort: `n_samples` samples with `per_sample` sequences each,
/// sorted sample ids, uniform clonal frequencies, alternating labels.
#[allow(dead_code)]
pub fn small_repertoire(n_samples: usize, per_sample: usize) -> (RepertoireData, SampleSet) {
    let n = n_samples * per_sample;
    let seq = Array2::from_shape_fn((n, 3), |(i, j)| (i * 3 + j) as i64);
    let sample_id: Vec<String> = (0..n)
        .map(|i| format!("s{:02}", i / per_sample))
        .collect();
    let freq = Array1::from_elem(n, 1.0 / per_sample as f64);

    let channels = ChannelSet {
        use_beta: true,
        ..Default::default()
    };
    let data = RepertoireData::new(
        channels,
        vec![(Channel::SeqBeta, ChannelData::Seq(seq))],
        sample_id,
        freq,
    );

    let sample_ids: Vec<String> = (0..n_samples).map(|i| format!("s{i:02}")).collect();
    let labels = Array2::from_shape_fn((n_samples, 2), |(i, j)| {
        if (i % 2 == 0) == (j == 0) {
            1.0
        } else {
            0.0
        }
    });
    (data, SampleSet::new(sample_ids, labels))
}

/// Fresh scratch directory under the system temp dir.
#[allow(dead_code)]
pub fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("tcrdiff_{}_{}", name, std::process::id()));
    if dir.exists() {
        std::fs::remove_dir_all(&dir).unwrap();
    }
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
