use super::{scan, GenericDataset, NdjsonReader, StreamingDataset, TrainingSample};
use crate::{common::*, label::LabelRegistry, raster::Rasterizer, split};

/// Streaming dataset over one pre-merged, pre-shuffled data file.
///
/// Class mixing happened upstream when the file was prepared, so each pull
/// parses one record, rasterizes it and derives the one-hot label from the
/// record's `word`. A stream ends after `num_samples` items, or at end of
/// file, whichever comes first. Streams are not rewindable; call [`stream`]
/// again for a fresh pass over the file.
///
/// [`stream`]: StreamingDataset::stream
#[derive(Debug, Clone)]
pub struct NdjsonStreamDataset {
    path: PathBuf,
    num_samples: usize,
    registry: Arc<LabelRegistry>,
    rasterizer: Rasterizer,
}

impl NdjsonStreamDataset {
    /// Wrap `path` with a declared sample count.
    pub fn new(
        path: impl Into<PathBuf>,
        num_samples: usize,
        registry: Arc<LabelRegistry>,
        rasterizer: Rasterizer,
    ) -> Self {
        Self {
            path: path.into(),
            num_samples,
            registry,
            rasterizer,
        }
    }

    /// Wrap `path`, discovering the sample count with a streaming line scan.
    pub async fn open(
        path: impl Into<PathBuf>,
        registry: Arc<LabelRegistry>,
        rasterizer: Rasterizer,
    ) -> Result<Self> {
        let path = path.into();
        let num_samples = scan::count_lines(&path).await?;
        Ok(Self::new(path, num_samples, registry, rasterizer))
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }
}

impl GenericDataset for NdjsonStreamDataset {
    fn input_channels(&self) -> usize {
        3
    }

    fn classes(&self) -> &IndexSet<String> {
        self.registry.names()
    }
}

impl StreamingDataset for NdjsonStreamDataset {
    fn stream(&self) -> Result<Pin<Box<dyn Stream<Item = Result<TrainingSample>> + Send>>> {
        let num_samples = self.num_samples;
        let num_classes = self.registry.len();
        let init = (
            self.path.clone(),
            self.registry.clone(),
            self.rasterizer.clone(),
            None::<NdjsonReader>,
            0usize,
        );

        let stream = stream::try_unfold(
            init,
            move |(path, registry, rasterizer, reader, yielded)| async move {
                if yielded == num_samples {
                    return Ok(None);
                }

                // the file is opened on the first pull, not at stream creation
                let mut reader = match reader {
                    Some(reader) => reader,
                    None => NdjsonReader::open(&path).await?,
                };

                let record = match reader.next_record().await? {
                    Some(record) => record,
                    None => return Ok(None),
                };
                let class_index = registry.index_of(&record.word)?;
                let sample = TrainingSample {
                    image: rasterizer.rasterize(&record.drawing),
                    label: split::one_hot(class_index, num_classes)?,
                };

                Ok(Some((
                    sample,
                    (path, registry, rasterizer, Some(reader), yielded + 1),
                )))
            },
        );

        Ok(Box::pin(stream))
    }
}
