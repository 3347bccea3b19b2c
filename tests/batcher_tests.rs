use seedforge::batcher::ClassBalancedBatches;
use seedforge::encoder::EncodedSet;

/// Single-cell rows whose value encodes the row index, offset per class so
/// x/y correspondence stays checkable after shuffling.
fn tagged_set(rows: usize, offset: f32) -> EncodedSet {
    let data: Vec<f32> = (0..rows).map(|i| offset + i as f32).collect();
    EncodedSet::from_raw(data, 1, 1, (0..rows).collect()).unwrap()
}

fn sampler(pos: usize, neg: usize, ratio: (usize, usize), batch_size: usize) -> ClassBalancedBatches {
    ClassBalancedBatches::new(
        tagged_set(pos, 1000.0),
        vec![1.0; pos],
        tagged_set(neg, 0.0),
        vec![0.0; neg],
        ratio,
        batch_size,
    )
    .unwrap()
}

#[test]
fn test_per_batch_composition() {
    let gen = sampler(60, 240, (1, 4), 50);
    assert_eq!(gen.positive_per_batch(), 10);
    assert_eq!(gen.negative_per_batch(), 40);
    assert_eq!(gen.len(), 6);

    for idx in 0..5 {
        let batch = gen.get_batch(idx);
        assert_eq!(batch.rows, 50);
        let positives = batch.y.iter().filter(|&&y| y > 0.5).count();
        assert_eq!(positives, 10, "batch {} composition off", idx);
    }
}

#[test]
fn test_trailing_batches_truncate() {
    // 55 positives: batches 0..5 take 10 each, batch 5 gets the last 5
    let gen = sampler(55, 240, (1, 4), 50);
    assert_eq!(gen.len(), 6);

    let tail = gen.get_batch(5);
    let positives = tail.y.iter().filter(|&&y| y > 0.5).count();
    assert_eq!(positives, 5);
    assert_eq!(tail.rows, 45); // 5 remaining positives + a full negative slice

    // Past the data entirely: empty, not an error
    let past = gen.get_batch(7);
    assert_eq!(past.rows, 0);
    assert!(past.x.is_empty() && past.y.is_empty());
}

#[test]
fn test_shuffle_is_reproducible() {
    let gen = sampler(60, 240, (1, 4), 50);
    assert_eq!(gen.get_batch(3), gen.get_batch(3));

    // Different indices get different permutations (same composition)
    let a = gen.get_batch(0);
    let b = gen.get_batch(1);
    assert_ne!(a, b);
}

#[test]
fn test_same_permutation_for_x_and_y() {
    // Labels mirror the cell values, so any x/y divergence after the
    // shuffle would break the pairing
    let pos = tagged_set(20, 1000.0);
    let neg = tagged_set(80, 0.0);
    let pos_labels: Vec<f32> = (0..20).map(|i| 1000.0 + i as f32).collect();
    let neg_labels: Vec<f32> = (0..80).map(|i| i as f32).collect();

    let gen = ClassBalancedBatches::new(pos, pos_labels, neg, neg_labels, (1, 4), 25).unwrap();
    for idx in 0..gen.len() {
        let batch = gen.get_batch(idx);
        assert_eq!(batch.x, batch.y, "x/y permutation diverged in batch {}", idx);
    }
}

#[test]
fn test_batches_are_shuffled() {
    let gen = sampler(60, 240, (1, 4), 50);
    let batch = gen.get_batch(0);
    // Positives-first concatenation order must not survive the shuffle
    let first_ten_all_positive = batch.y[..10].iter().all(|&y| y > 0.5);
    assert!(!first_ten_all_positive);
}

#[test]
fn test_construction_validates_lengths() {
    let pos = tagged_set(10, 1000.0);
    let neg = tagged_set(40, 0.0);

    assert!(ClassBalancedBatches::new(
        pos.clone(),
        vec![1.0; 9], // one label short
        neg.clone(),
        vec![0.0; 40],
        (1, 4),
        50
    )
    .is_err());

    assert!(ClassBalancedBatches::new(
        pos.clone(),
        vec![1.0; 10],
        neg.clone(),
        vec![0.0; 40],
        (0, 0),
        50
    )
    .is_err());

    assert!(ClassBalancedBatches::new(pos, vec![1.0; 10], neg, vec![0.0; 40], (1, 4), 0).is_err());

    // Mismatched row geometry between the classes
    let wide = EncodedSet::from_raw(vec![0.0; 20], 2, 1, (0..10).collect()).unwrap();
    let narrow = tagged_set(10, 0.0);
    assert!(
        ClassBalancedBatches::new(wide, vec![1.0; 10], narrow, vec![0.0; 10], (1, 1), 4).is_err()
    );
}

#[test]
fn test_batches_iterator_covers_everything() {
    let gen = sampler(60, 240, (1, 4), 50);
    let total: usize = gen.batches().map(|b| b.rows).sum();
    assert_eq!(total, 300);
}
