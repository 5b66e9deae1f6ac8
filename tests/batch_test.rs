use rand::rngs::SmallRng;
use rand::SeedableRng;
use tcrdiff::{batches, batches_ordered, tile_sequences};

#[test]
fn shuffled_batches_cover_every_index_once() {
    let mut rng = SmallRng::seed_from_u64(42);
    let chunks: Vec<Vec<usize>> = batches(23, 5, &mut rng).collect();
    assert_eq!(chunks.len(), 5); // ceil(23 / 5)
    assert_eq!(chunks.last().unwrap().len(), 3);

    let mut seen: Vec<usize> = chunks.into_iter().flatten().collect();
    assert_eq!(seen.len(), 23);
    seen.sort_unstable();
    assert_eq!(seen, (0..23).collect::<Vec<_>>());
}

#[test]
fn shuffled_batches_share_one_permutation() {
    // the same seed must give the same order twice
    let mut rng_a = SmallRng::seed_from_u64(7);
    let mut rng_b = SmallRng::seed_from_u64(7);
    let a: Vec<Vec<usize>> = batches(50, 8, &mut rng_a).collect();
    let b: Vec<Vec<usize>> = batches(50, 8, &mut rng_b).collect();
    assert_eq!(a, b);
}

#[test]
fn ordered_batches_preserve_order() {
    let chunks: Vec<Vec<usize>> = batches_ordered(10, 4).collect();
    assert_eq!(chunks, vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7], vec![8, 9]]);
}

#[test]
fn empty_input_yields_no_batches() {
    assert_eq!(batches_ordered(0, 4).count(), 0);
    let mut rng = SmallRng::seed_from_u64(0);
    assert_eq!(batches(0, 4, &mut rng).count(), 0);
}

#[test]
fn exact_multiple_has_no_short_batch() {
    let chunks: Vec<Vec<usize>> = batches_ordered(12, 4).collect();
    assert_eq!(chunks.len(), 3);
    assert!(chunks.iter().all(|c| c.len() == 4));
}

#[test]
fn tiling_covers_the_tail() {
    let seqs = vec!["ABCDEFGHIJKLMNOPQRST".to_string()]; // length 20
    let (tiles, source) = tile_sequences(&seqs, 15, 7);
    assert_eq!(tiles, vec!["ABCDEFGHIJKLMNO", "FGHIJKLMNOPQRST"]);
    assert_eq!(source, vec![0, 0]);
    // the final tile is anchored at the string end
    assert!(tiles.iter().all(|t| t.len() == 15));
}

#[test]
fn tiling_records_source_per_tile() {
    let seqs = vec![
        "ABCDEFGHIJKLMNOPQRSTUVWXYZ".to_string(),
        "ABCDEFGHIJKLMNOP".to_string(),
    ];
    let (tiles, source) = tile_sequences(&seqs, 15, 7);
    assert_eq!(tiles.len(), source.len());
    // no tile of a string starts past len - mer
    for (tile, &jj) in tiles.iter().zip(&source) {
        assert_eq!(tile.len(), 15);
        assert!(seqs[jj].contains(tile.as_str()));
        let start = seqs[jj].find(tile.as_str()).unwrap();
        assert!(start <= seqs[jj].len() - 15);
    }
}

#[test]
fn tiling_short_string_emits_it_whole() {
    let seqs = vec!["ABCDE".to_string()];
    let (tiles, source) = tile_sequences(&seqs, 15, 7);
    assert_eq!(tiles, vec!["ABCDE"]);
    assert_eq!(source, vec![0]);
}

#[test]
fn tiling_skips_empty_strings() {
    let seqs = vec![String::new(), "ABCDEFGHIJKLMNOP".to_string()];
    let (tiles, source) = tile_sequences(&seqs, 15, 7);
    assert!(source.iter().all(|&jj| jj == 1));
    assert!(!tiles.is_empty());
}
