use super::{ndjson, scan};
use crate::{
    common::*,
    label::LabelRegistry,
    raster::{PixelGrid, Rasterizer},
};

/// Which records of a class file an assembly pass materializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplePolicy {
    /// A fresh uniformly random index sample, duplicates possible.
    Random,
    /// The first records in file order, after discarding `skip` kept ones.
    Sequential { skip: usize },
    /// The contiguous window of records starting at
    /// `per_class * batch_index`.
    Windowed { batch_index: usize },
}

/// In-memory dataset assembly options.
#[derive(Debug, Clone)]
pub struct DatasetConfig {
    /// Directory holding the per-class data files.
    pub sketches_dir: PathBuf,
    /// Records to materialize per class.
    pub per_class: usize,
    pub policy: SamplePolicy,
    /// Drop records with `recognized == false`. Sequential and windowed
    /// reads only; random sampling addresses raw line numbers.
    pub recognized_only: bool,
    pub rasterizer: Rasterizer,
}

/// Aligned images and integer class labels.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingPair {
    pub images: Vec<PixelGrid>,
    pub labels: Vec<usize>,
}

impl TrainingPair {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Read, rasterize and label `per_class` drawings for every registry class.
///
/// Classes contribute in registry order, all of one class before the next;
/// shuffling is the caller's concern. A file with fewer remaining records
/// than requested contributes fewer samples without error.
pub async fn load_dataset<R>(
    config: &DatasetConfig,
    registry: &LabelRegistry,
    rng: &mut R,
) -> Result<TrainingPair>
where
    R: Rng + ?Sized,
{
    let start = Instant::now();
    let mut images = vec![];
    let mut labels = vec![];

    for (class_index, name) in registry.names().iter().enumerate() {
        let path = LabelRegistry::class_file(&config.sketches_dir, name);
        let records = match config.policy {
            SamplePolicy::Random => ndjson::read_random(&path, config.per_class, rng).await,
            SamplePolicy::Sequential { skip } => {
                ndjson::read_prefix(&path, config.per_class, skip, config.recognized_only).await
            }
            SamplePolicy::Windowed { batch_index } => {
                let skip = config.per_class * batch_index;
                ndjson::read_prefix(&path, config.per_class, skip, config.recognized_only).await
            }
        }
        .with_context(|| format!("failed to load drawings of class '{}'", name))?;

        images.extend(
            records
                .iter()
                .map(|record| config.rasterizer.rasterize(&record.drawing)),
        );
        labels.extend(iter::repeat(class_index).take(records.len()));
    }

    info!(
        "loaded {} drawings across {} classes in {:.2?}",
        images.len(),
        registry.len(),
        start.elapsed()
    );

    Ok(TrainingPair { images, labels })
}

/// Render one random drawing from a random class file to `save_path`.
///
/// Returns the class word of the rendered record. The saved image is exactly
/// the grid a dataset build would produce for that record.
pub async fn save_random_drawing<R>(
    sketches_dir: impl AsRef<Path>,
    registry: &LabelRegistry,
    rasterizer: &Rasterizer,
    save_path: impl AsRef<Path>,
    rng: &mut R,
) -> Result<String>
where
    R: Rng + ?Sized,
{
    let name = registry
        .names()
        .get_index(rng.gen_range(0..registry.len()))
        .ok_or_else(|| format_err!("the label registry is empty"))?;
    let path = LabelRegistry::class_file(sketches_dir.as_ref(), name);

    let line_count = scan::count_lines(&path).await?;
    ensure!(line_count > 0, "no records in '{}'", path.display());
    let target = rng.gen_range(0..line_count);

    let record = ndjson::read_at_indices(&path, &[target])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| format_err!("no record at index {} in '{}'", target, path.display()))?;

    rasterizer.rasterize_to(&record.drawing, save_path)?;
    Ok(record.word)
}
