//! Mini-batch index iteration and fixed-width sequence tiling.
use rand::seq::SliceRandom;
use rand::Rng;

/// Lazy, finite iterator over index chunks covering `0..n` exactly once.
///
/// All co-indexed arrays of a batch are selected with the same chunk, so
/// cross-array alignment is preserved even when the order is shuffled. The
/// final chunk takes the remainder and may be shorter than `batch_size`.
#[derive(Clone, Debug)]
pub struct Batches {
    order: Vec<usize>,
    batch_size: usize,
    cursor: usize,
}

impl Iterator for Batches {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = usize::min(self.cursor + self.batch_size, self.order.len());
        let chunk = self.order[self.cursor..end].to_vec();
        self.cursor = end;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.order.len() - self.cursor).div_ceil(self.batch_size);
        (left, Some(left))
    }
}

impl ExactSizeIterator for Batches {}

/// Batch `n` indices into chunks of `batch_size` after drawing one shared
/// random permutation.
pub fn batches<R: Rng>(n: usize, batch_size: usize, rng: &mut R) -> Batches {
    assert!(batch_size > 0, "batch size must be positive");
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    Batches {
        order,
        batch_size,
        cursor: 0,
    }
}

/// Batch `n` indices into chunks of `batch_size` in original order.
pub fn batches_ordered(n: usize, batch_size: usize) -> Batches {
    assert!(batch_size > 0, "batch size must be positive");
    Batches {
        order: (0..n).collect(),
        batch_size,
        cursor: 0,
    }
}

/// Decompose each string into windows of width `mer`, advancing by `stride`.
///
/// Once a step would overrun the string end, one final window anchored at
/// the last `mer` characters is emitted and the string is done, so the tail
/// is always covered. Returns the tiles and a parallel array recording
/// which input string produced each tile.
pub fn tile_sequences(seqs: &[String], mer: usize, stride: usize) -> (Vec<String>, Vec<usize>) {
    assert!(stride > 0, "stride must be positive");
    let mut tiles = Vec::new();
    let mut source = Vec::new();
    for (jj, seq) in seqs.iter().enumerate() {
        let len = seq.len();
        for ii in (0..len).step_by(stride) {
            if ii + mer <= len {
                tiles.push(seq[ii..ii + mer].to_string());
                source.push(jj);
            } else {
                // strings shorter than a full window are emitted whole
                tiles.push(seq[len.saturating_sub(mer)..].to_string());
                source.push(jj);
                break;
            }
        }
    }
    (tiles, source)
}
