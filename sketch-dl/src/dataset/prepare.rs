use super::scan;
use crate::{common::*, label::LabelRegistry};
use async_std::{
    fs::File,
    io::{BufReader, BufWriter},
    task,
};
use std::process::Command;

/// Options for building the merged train/test dataset files.
#[derive(Debug, Clone)]
pub struct PrepareConfig {
    /// Directory holding the per-class data files.
    pub sketches_dir: PathBuf,
    /// Destination of the shuffled training records.
    pub train_file: PathBuf,
    /// Destination of the shuffled testing records.
    pub test_file: PathBuf,
    /// Ratio of each class file routed to the training split.
    pub train_ratio: f64,
    /// Per-class record cap; `None` reads whole files.
    pub max_records: Option<usize>,
}

/// Split every class file of the registry into train/test record files, then
/// shuffle both outputs.
///
/// Each class file contributes its first `floor(count * train_ratio)` records
/// to the training file and the remainder to the testing file, capped at
/// `max_records`. Lines are routed verbatim, never re-encoded. The raw
/// concatenations are handed to the external shuffle collaborator last, so a
/// failed shuffle leaves the raw files on disk for inspection.
pub async fn build_dataset_files(config: &PrepareConfig, registry: &LabelRegistry) -> Result<()> {
    let PrepareConfig {
        ref sketches_dir,
        ref train_file,
        ref test_file,
        train_ratio,
        max_records,
    } = *config;
    ensure!(
        (0.0..=1.0).contains(&train_ratio),
        "train_ratio {} out of range [0, 1]",
        train_ratio
    );

    let start = Instant::now();
    let raw_train = raw_path(train_file);
    let raw_test = raw_path(test_file);

    {
        let mut train_writer = BufWriter::new(File::create(&raw_train).await?);
        let mut test_writer = BufWriter::new(File::create(&raw_test).await?);

        for name in registry.names() {
            let class_start = Instant::now();
            let path = LabelRegistry::class_file(sketches_dir, name);

            let mut line_count = scan::count_lines(&path).await?;
            if let Some(cap) = max_records {
                line_count = line_count.min(cap);
            }
            let train_lines = (line_count as f64 * train_ratio).floor() as usize;

            let file = File::open(&path)
                .await
                .with_context(|| format!("failed to open '{}'", path.display()))?;
            let mut lines = BufReader::new(file).lines();
            let mut counter = 0;

            while counter < line_count {
                let line = match lines.next().await {
                    Some(line) => line
                        .with_context(|| format!("failed to read '{}'", path.display()))?,
                    None => break,
                };
                let writer = if counter < train_lines {
                    &mut train_writer
                } else {
                    &mut test_writer
                };
                writer.write_all(line.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                counter += 1;
            }

            info!(
                "appended {} drawings from '{}' in {:.2?}",
                counter,
                path.display(),
                class_start.elapsed()
            );
        }

        train_writer.flush().await?;
        test_writer.flush().await?;
    }

    info!(
        "created raw dataset files for {} classes in {:.2?}",
        registry.len(),
        start.elapsed()
    );

    info!("shuffling dataset files ...");
    let shuffle_start = Instant::now();
    shuffle_file(&raw_train, train_file).await?;
    shuffle_file(&raw_test, test_file).await?;
    info!(
        "randomly shuffled train and test files in {:.2?}",
        shuffle_start.elapsed()
    );

    Ok(())
}

/// Shuffle `src`'s lines uniformly at random into `dst` via the system `shuf`
/// utility.
///
/// `shuf` is treated as a black box with a success/failure outcome; `src` is
/// removed only after a successful shuffle, otherwise it is left intact and
/// the error propagates.
pub async fn shuffle_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<()> {
    let src = src.as_ref().to_owned();
    let dst = dst.as_ref().to_owned();

    task::spawn_blocking(move || {
        let status = Command::new("shuf")
            .arg(&src)
            .arg("-o")
            .arg(&dst)
            .status()
            .context("failed to run 'shuf'")?;
        ensure!(
            status.success(),
            "'shuf' exited with {} for '{}'",
            status,
            src.display()
        );
        std::fs::remove_file(&src)
            .with_context(|| format!("failed to remove '{}'", src.display()))?;
        Ok(())
    })
    .await
}

fn raw_path(path: &Path) -> PathBuf {
    let mut raw = path.as_os_str().to_owned();
    raw.push(".raw");
    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_class_file(dir: &Path, name: &str, count: usize) -> Result<()> {
        let path = LabelRegistry::class_file(dir, name);
        let mut file = std::fs::File::create(path)?;
        for index in 0..count {
            writeln!(file, r#"{{"word": "{}", "index": {}}}"#, name, index)?;
        }
        Ok(())
    }

    fn read_words(path: &Path) -> Result<Vec<String>> {
        let text = std::fs::read_to_string(path)?;
        text.lines()
            .map(|line| -> Result<String> {
                let value: serde_json::Value = serde_json::from_str(line)?;
                Ok(value["word"].as_str().unwrap().to_owned())
            })
            .collect()
    }

    #[async_std::test]
    async fn build_dataset_files_test() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write_class_file(dir.path(), "cat", 10)?;
        write_class_file(dir.path(), "dog", 10)?;
        let registry = LabelRegistry::from_dir(dir.path())?;

        let config = PrepareConfig {
            sketches_dir: dir.path().to_owned(),
            train_file: dir.path().join("train_data.ndjson"),
            test_file: dir.path().join("test_data.ndjson"),
            train_ratio: 0.8,
            max_records: None,
        };
        build_dataset_files(&config, &registry).await?;

        // 8 train + 2 test records per class, shuffled but complete
        let train_words = read_words(&config.train_file)?;
        let test_words = read_words(&config.test_file)?;
        assert_eq!(train_words.len(), 16);
        assert_eq!(test_words.len(), 4);
        assert_eq!(
            train_words.iter().filter(|word| *word == "cat").count(),
            8
        );
        assert_eq!(test_words.iter().filter(|word| *word == "dog").count(), 2);

        // the raw intermediates were cleaned up
        assert!(!dir.path().join("train_data.ndjson.raw").exists());
        assert!(!dir.path().join("test_data.ndjson.raw").exists());
        Ok(())
    }

    #[async_std::test]
    async fn max_records_cap_test() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write_class_file(dir.path(), "cat", 10)?;
        let registry = LabelRegistry::from_dir(dir.path())?;

        let config = PrepareConfig {
            sketches_dir: dir.path().to_owned(),
            train_file: dir.path().join("train_data.ndjson"),
            test_file: dir.path().join("test_data.ndjson"),
            train_ratio: 0.5,
            max_records: Some(4),
        };
        build_dataset_files(&config, &registry).await?;

        assert_eq!(read_words(&config.train_file)?.len(), 2);
        assert_eq!(read_words(&config.test_file)?.len(), 2);
        Ok(())
    }

    #[async_std::test]
    async fn failed_shuffle_keeps_source_test() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let src = dir.path().join("records.ndjson.raw");
        std::fs::write(&src, "{}\n")?;

        // an unwritable destination makes shuf fail
        let dst = dir.path().join("no-such-dir").join("records.ndjson");
        assert!(shuffle_file(&src, &dst).await.is_err());
        assert!(src.exists());
        Ok(())
    }

    #[async_std::test]
    async fn shuffle_file_test() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let src = dir.path().join("records.ndjson.raw");
        let lines: Vec<String> = (0..100).map(|index| format!(r#"{{"i":{}}}"#, index)).collect();
        std::fs::write(&src, lines.join("\n") + "\n")?;

        let dst = dir.path().join("records.ndjson");
        shuffle_file(&src, &dst).await?;

        assert!(!src.exists());
        let mut shuffled: Vec<String> = std::fs::read_to_string(&dst)?
            .lines()
            .map(ToOwned::to_owned)
            .collect();
        shuffled.sort();
        let mut expected = lines;
        expected.sort();
        assert_eq!(shuffled, expected);
        Ok(())
    }
}
