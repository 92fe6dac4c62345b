use crate::common::*;
use async_std::{fs::File, io::BufReader};

const CHUNK_SIZE: usize = 64 * 1024;

/// Count the newline-delimited records in `path` with a single forward pass.
///
/// The file is read chunk by chunk and never held in memory at once. A
/// trailing line without a final newline still counts as a record, matching
/// the reader's notion of one JSON document per line.
pub async fn count_lines(path: impl AsRef<Path>) -> Result<usize> {
    let path = path.as_ref();
    let file = File::open(path)
        .await
        .with_context(|| format!("failed to open '{}'", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut chunk = vec![0u8; CHUNK_SIZE];
    let mut count = 0;
    let mut last_byte = b'\n';

    loop {
        let len = reader
            .read(&mut chunk)
            .await
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        if len == 0 {
            break;
        }
        count += chunk[..len].iter().filter(|&&byte| byte == b'\n').count();
        last_byte = chunk[len - 1];
    }

    // an unterminated tail is still one record
    if last_byte != b'\n' {
        count += 1;
    }

    Ok(count)
}

/// Draw `n` record indices in `[0, max)` uniformly at random, sorted
/// ascending.
///
/// Each index is drawn independently, so duplicates are possible. Callers
/// that need exactly `n` distinct records must over-request or de-duplicate
/// downstream. `n > max` is permitted and only raises the duplicate rate.
pub fn sample_indices<R>(rng: &mut R, max: usize, n: usize) -> Vec<usize>
where
    R: Rng + ?Sized,
{
    if max == 0 {
        return Vec::new();
    }
    let mut indices: Vec<_> = (0..n).map(|_| rng.gen_range(0..max)).collect();
    indices.sort_unstable();
    indices
}
