use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use std::path::PathBuf;

const DEFAULT_DATASET_FILE: &str = "recipes.csv";

pub struct Config {
    pub dataset_path: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "mealplan").context("Could not determine home directory")?;

        let dataset_path = proj_dirs.data_dir().join(DEFAULT_DATASET_FILE);

        Ok(Config { dataset_path })
    }

    /// The dataset in the data directory, if one has been placed there.
    pub fn default_dataset(&self) -> Result<PathBuf> {
        if !self.dataset_path.exists() {
            bail!(
                "Recipe dataset not found: {}. Pass --file or place a CSV there",
                self.dataset_path.display()
            );
        }
        Ok(self.dataset_path.clone())
    }

    #[cfg(test)]
    pub fn in_dir(dir: &std::path::Path) -> Self {
        Config {
            dataset_path: dir.join(DEFAULT_DATASET_FILE),
        }
    }
}

/// Pick the dataset to load. An explicit path never consults the data directory.
pub fn resolve_dataset(file: Option<PathBuf>) -> Result<PathBuf> {
    match file {
        Some(path) => {
            if !path.exists() {
                bail!("Recipe dataset not found: {}", path.display());
            }
            Ok(path)
        }
        None => Config::load()?.default_dataset(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_dataset_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("mine.csv");
        std::fs::write(&explicit, "Recipe Name\n").unwrap();

        assert_eq!(resolve_dataset(Some(explicit.clone())).unwrap(), explicit);
    }

    #[test]
    fn test_resolve_dataset_explicit_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.csv");
        let err = resolve_dataset(Some(missing)).unwrap_err();
        assert!(err.to_string().contains("Recipe dataset not found"));
        assert!(err.to_string().contains("nope.csv"));
    }

    #[test]
    fn test_default_dataset_location() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::in_dir(dir.path());
        let err = config.default_dataset().unwrap_err();
        assert!(err.to_string().contains("Pass --file"));

        std::fs::write(&config.dataset_path, "Recipe Name\n").unwrap();
        assert_eq!(config.default_dataset().unwrap(), config.dataset_path);
    }
}
