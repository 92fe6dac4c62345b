use anyhow::{Context, Result};
use sketch_dl::{
    dataset::{self, PrepareConfig},
    label::LabelRegistry,
    raster::{self, Rasterizer},
};
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, Clone, StructOpt)]
/// Build sketch classifier dataset files
enum Args {
    /// Merge the per-class files into shuffled train/test dataset files
    Prepare {
        #[structopt(long, default_value = "./sketches")]
        /// directory holding the per-class ndjson files
        sketches_dir: PathBuf,
        #[structopt(long, default_value = "train_data.ndjson")]
        /// destination of the training records
        train_file: PathBuf,
        #[structopt(long, default_value = "test_data.ndjson")]
        /// destination of the testing records
        test_file: PathBuf,
        #[structopt(long, default_value = "0.8")]
        /// ratio of each class file routed to the training split
        train_ratio: f64,
        #[structopt(long)]
        /// per-class record cap; omit to read whole files
        max_records: Option<usize>,
    },
    /// Render one random drawing to an image file
    Render {
        #[structopt(long, default_value = "./sketches")]
        /// directory holding the per-class ndjson files
        sketches_dir: PathBuf,
        #[structopt(long, default_value = "image.png")]
        /// destination of the rendered image
        output: PathBuf,
        #[structopt(long)]
        /// read back at native canvas resolution instead of downscaling
        no_scale: bool,
    },
}

#[async_std::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();

    match Args::from_args() {
        Args::Prepare {
            sketches_dir,
            train_file,
            test_file,
            train_ratio,
            max_records,
        } => {
            let registry = LabelRegistry::from_dir(&sketches_dir).with_context(|| {
                format!("failed to discover classes in '{}'", sketches_dir.display())
            })?;
            let config = PrepareConfig {
                sketches_dir,
                train_file,
                test_file,
                train_ratio,
                max_records,
            };
            dataset::build_dataset_files(&config, &registry).await?;
        }
        Args::Render {
            sketches_dir,
            output,
            no_scale,
        } => {
            let registry = LabelRegistry::from_dir(&sketches_dir).with_context(|| {
                format!("failed to discover classes in '{}'", sketches_dir.display())
            })?;
            let rasterizer = if no_scale {
                Rasterizer::new(raster::IMAGE_SIZE, raster::STROKE_WIDTH, None)?
            } else {
                Rasterizer::default()
            };

            let mut rng = rand::thread_rng();
            let word = dataset::save_random_drawing(
                &sketches_dir,
                &registry,
                &rasterizer,
                &output,
                &mut rng,
            )
            .await?;
            log::info!("saved random '{}' drawing to '{}'", word, output.display());
        }
    }

    Ok(())
}
