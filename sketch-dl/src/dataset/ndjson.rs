use super::{record::SketchRecord, scan};
use crate::common::*;
use async_std::{fs::File, io::BufReader};

/// Forward-only pull reader over a file of one-JSON-object-per-line records.
///
/// Dropping the reader closes the underlying file, so a consumer cancels a
/// scan early simply by returning before the file is exhausted. Readers are
/// not rewindable; re-scanning a file takes a new reader.
#[derive(Debug)]
pub struct NdjsonReader {
    path: PathBuf,
    lines: futures::io::Lines<BufReader<File>>,
    cursor: usize,
}

impl NdjsonReader {
    /// Open `path` for record-at-a-time reading.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_owned();
        let file = File::open(&path)
            .await
            .with_context(|| format!("failed to open '{}'", path.display()))?;
        let lines = BufReader::new(file).lines();

        Ok(Self {
            path,
            lines,
            cursor: 0,
        })
    }

    /// Pull the next record, or `None` at end of file.
    ///
    /// A malformed line is fatal for the whole read of this file.
    pub async fn next_record(&mut self) -> Result<Option<SketchRecord>> {
        let line = match self.lines.next().await {
            Some(line) => {
                line.with_context(|| format!("failed to read '{}'", self.path.display()))?
            }
            None => return Ok(None),
        };

        let record = serde_json::from_str(&line).with_context(|| {
            format!(
                "malformed record at line {} of '{}'",
                self.cursor + 1,
                self.path.display()
            )
        })?;
        self.cursor += 1;

        Ok(Some(record))
    }

    /// 0-based index of the record the next pull will yield.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Adapt the reader into a record stream.
    pub fn into_stream(self) -> impl Stream<Item = Result<SketchRecord>> + Send {
        stream::try_unfold(self, |mut reader| async move {
            let next = reader.next_record().await?;
            Ok(next.map(|record| (record, reader)))
        })
    }
}

/// Scan `path` from the start, keeping up to `n` records after discarding the
/// first `skip` kept ones.
///
/// With `recognized_only`, records with `recognized == false` are dropped
/// before the skip/take counting. Reading stops the moment the take count is
/// satisfied; reaching end of file first returns the shorter result.
pub async fn read_prefix(
    path: impl AsRef<Path>,
    n: usize,
    skip: usize,
    recognized_only: bool,
) -> Result<Vec<SketchRecord>> {
    let mut kept = Vec::with_capacity(n);
    if n == 0 {
        return Ok(kept);
    }

    let mut reader = NdjsonReader::open(path).await?;
    let mut skipped = 0;

    while let Some(record) = reader.next_record().await? {
        if recognized_only && !record.recognized {
            continue;
        }
        if skipped < skip {
            skipped += 1;
            continue;
        }
        kept.push(record);
        if kept.len() == n {
            break;
        }
    }

    Ok(kept)
}

/// Walk records in order, keeping the record whose 0-based index equals the
/// next target.
///
/// `targets` must be ascending; a run of duplicate targets keeps the same
/// record once per occurrence. Reading stops once all targets are consumed,
/// and targets beyond end of file are dropped silently.
pub async fn read_at_indices(
    path: impl AsRef<Path>,
    targets: &[usize],
) -> Result<Vec<SketchRecord>> {
    ensure!(
        targets.windows(2).all(|pair| pair[0] <= pair[1]),
        "target indices must be ascending"
    );

    let mut records = Vec::with_capacity(targets.len());
    if targets.is_empty() {
        return Ok(records);
    }

    let mut reader = NdjsonReader::open(path).await?;
    let mut targets = targets.iter().copied().peekable();

    loop {
        let index = reader.cursor();
        let record = match reader.next_record().await? {
            Some(record) => record,
            None => break,
        };

        while targets.next_if_eq(&index).is_some() {
            records.push(record.clone());
        }
        if targets.peek().is_none() {
            break;
        }
    }

    Ok(records)
}

/// Read `n` records at fresh uniformly random indices.
///
/// Indices are drawn with replacement, so the result may repeat records. The
/// line count is discovered by a streaming scan before the targeted read.
pub async fn read_random<R>(
    path: impl AsRef<Path>,
    n: usize,
    rng: &mut R,
) -> Result<Vec<SketchRecord>>
where
    R: Rng + ?Sized,
{
    let path = path.as_ref();
    let line_count = scan::count_lines(path).await?;
    let targets = scan::sample_indices(rng, line_count, n);
    read_at_indices(path, &targets).await
}
