//! Dataset processing toolkit.

mod assemble;
mod ndjson;
mod prepare;
mod record;
mod scan;
mod streaming;

pub use assemble::*;
pub use ndjson::*;
pub use prepare::*;
pub use record::*;
pub use scan::*;
pub use streaming::*;

use crate::{common::*, raster::PixelGrid};

/// The generic dataset trait.
pub trait GenericDataset
where
    Self: Debug + Send,
{
    /// The number of color channels of the dataset.
    fn input_channels(&self) -> usize;

    /// The list of class names of the dataset.
    fn classes(&self) -> &IndexSet<String>;
}

/// One streamed training example.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSample {
    pub image: PixelGrid,
    /// One-hot class encoding, aligned with the dataset's class list.
    pub label: Vec<f32>,
}

/// The dataset that can be enumerated through a stream.
pub trait StreamingDataset
where
    Self: GenericDataset,
{
    fn stream(&self) -> Result<Pin<Box<dyn Stream<Item = Result<TrainingSample>> + Send>>>;
}
