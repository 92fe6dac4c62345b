//! Synchronized shuffling and train/test partitioning.

use crate::common::*;

/// Permute `a` and `b` with one synchronized Fisher–Yates pass, keeping the
/// pairing `(a[i], b[i])` intact.
///
/// Fails before any mutation if the slices disagree in length.
pub fn shuffle<T, U, R>(rng: &mut R, a: &mut [T], b: &mut [U]) -> Result<()>
where
    R: Rng + ?Sized,
{
    ensure!(
        a.len() == b.len(),
        "array sizes do not match for shuffle: {} vs {}",
        a.len(),
        b.len()
    );

    for index in (1..a.len()).rev() {
        let other = rng.gen_range(0..=index);
        a.swap(index, other);
        b.swap(index, other);
    }

    Ok(())
}

/// Shuffle `(x, y)` together, then split at `ceil(len * train_ratio)`.
///
/// Returns `(train_x, train_y, test_x, test_y)`, all pairings preserved.
pub fn train_test_split<T, U, R>(
    rng: &mut R,
    mut x: Vec<T>,
    mut y: Vec<U>,
    train_ratio: f64,
) -> Result<(Vec<T>, Vec<U>, Vec<T>, Vec<U>)>
where
    R: Rng + ?Sized,
{
    ensure!(
        (0.0..=1.0).contains(&train_ratio),
        "train_ratio {} out of range [0, 1]",
        train_ratio
    );
    shuffle(rng, &mut x, &mut y)?;

    let num_train = (x.len() as f64 * train_ratio).ceil() as usize;
    let test_x = x.split_off(num_train);
    let test_y = y.split_off(num_train);

    Ok((x, y, test_x, test_y))
}

/// One-hot encode `label` against the full class count.
pub fn one_hot(label: usize, num_classes: usize) -> Result<Vec<f32>> {
    ensure!(
        label < num_classes,
        "label {} out of range for {} classes",
        label,
        num_classes
    );
    let mut encoding = vec![0.0; num_classes];
    encoding[label] = 1.0;
    Ok(encoding)
}

/// One-hot encode a label sequence.
pub fn one_hot_all(labels: &[usize], num_classes: usize) -> Result<Vec<Vec<f32>>> {
    labels
        .iter()
        .map(|&label| one_hot(label, num_classes))
        .collect()
}
