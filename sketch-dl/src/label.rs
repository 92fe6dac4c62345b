//! Class name discovery and label indexing.

use crate::common::*;
use regex::Regex;

/// File name prefix of the per-class data files.
pub const CLASS_FILE_PREFIX: &str = "full_simplified";

static CLASS_FILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^full_simplified_(.+)\.ndjson$").unwrap());

/// The ordered set of class names of a sketches directory.
///
/// Class order defines the integer label indices the rest of the pipeline
/// depends on, so a registry is built once per run and passed by reference
/// afterwards; it is never extended or invalidated mid-run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRegistry {
    classes: IndexSet<String>,
}

impl LabelRegistry {
    /// Scan `dir` for `full_simplified_<name>.ndjson` files and register the
    /// embedded class names in listing order.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let pattern = dir
            .join(format!("{}_*.ndjson", CLASS_FILE_PREFIX))
            .to_str()
            .ok_or_else(|| format_err!("non-unicode path '{}'", dir.display()))?
            .to_owned();

        let names: Vec<_> = glob::glob(&pattern)
            .with_context(|| format!("bad glob pattern '{}'", pattern))?
            .map(|entry| -> Result<_> {
                let path = entry?;
                let file_name = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .ok_or_else(|| format_err!("bad file name '{}'", path.display()))?;
                let captures = CLASS_FILE_RE
                    .captures(file_name)
                    .ok_or_else(|| format_err!("unexpected file name '{}'", file_name))?;
                Ok(captures[1].to_owned())
            })
            .try_collect()
            .with_context(|| format!("failed to scan '{}'", dir.display()))?;

        Self::from_names(names).with_context(|| format!("no usable class files in '{}'", dir.display()))
    }

    /// Build a registry from an explicit ordered name list.
    pub fn from_names(names: Vec<String>) -> Result<Self> {
        let count = names.len();
        let classes: IndexSet<_> = names.into_iter().collect();
        ensure!(classes.len() == count, "duplicated class names found");
        ensure!(!classes.is_empty(), "no class names found");
        Ok(Self { classes })
    }

    /// The class names in index order.
    pub fn names(&self) -> &IndexSet<String> {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Map a class name to its stable index.
    ///
    /// Names are case-folded and spaces become underscores before lookup. An
    /// unknown name is an error; the registry never assigns new indices
    /// after construction.
    pub fn index_of(&self, name: &str) -> Result<usize> {
        let normalized = normalize(name);
        self.classes
            .get_index_of(normalized.as_str())
            .ok_or_else(|| format_err!("unknown label '{}'", name))
    }

    /// The conventional data file path of class `name` under `dir`.
    pub fn class_file(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{}_{}.ndjson", CLASS_FILE_PREFIX, name))
    }
}

fn normalize(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_order_test() -> Result<()> {
        let dir = tempfile::tempdir()?;
        for name in ["cat", "dog", "coffee_cup"] {
            std::fs::write(LabelRegistry::class_file(dir.path(), name), "")?;
        }
        // an unrelated file is not a class
        std::fs::write(dir.path().join("notes.txt"), "")?;

        let registry = LabelRegistry::from_dir(dir.path())?;
        let names: Vec<_> = registry.names().iter().cloned().collect();
        assert_eq!(names, vec!["cat", "coffee_cup", "dog"]);
        Ok(())
    }

    #[test]
    fn index_lookup_test() -> Result<()> {
        let registry =
            LabelRegistry::from_names(vec!["cat".to_owned(), "dog".to_owned()])?;

        assert_eq!(registry.index_of("cat")?, 0);
        assert_eq!(registry.index_of("dog")?, 1);

        // lookups normalize case and spaces
        assert_eq!(registry.index_of("Dog")?, 1);
        let registry = LabelRegistry::from_names(vec!["coffee_cup".to_owned()])?;
        assert_eq!(registry.index_of("Coffee Cup")?, 0);

        Ok(())
    }

    #[test]
    fn unknown_label_test() -> Result<()> {
        let registry =
            LabelRegistry::from_names(vec!["cat".to_owned(), "dog".to_owned()])?;
        let err = registry.index_of("bird").unwrap_err();
        assert!(err.to_string().contains("unknown label"));
        Ok(())
    }

    #[test]
    fn rejects_bad_registries_test() {
        assert!(LabelRegistry::from_names(vec![]).is_err());
        assert!(
            LabelRegistry::from_names(vec!["cat".to_owned(), "cat".to_owned()]).is_err()
        );
    }

    #[test]
    fn empty_dir_test() -> Result<()> {
        let dir = tempfile::tempdir()?;
        assert!(LabelRegistry::from_dir(dir.path()).is_err());
        Ok(())
    }

    #[test]
    fn class_file_test() {
        assert_eq!(
            LabelRegistry::class_file(Path::new("./sketches"), "cat"),
            Path::new("./sketches/full_simplified_cat.ndjson")
        );
    }
}
