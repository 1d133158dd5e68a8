use std::path::{Path, PathBuf};

pub const DEFAULT_STORE_DIR: &str = "data/vector_store";
pub const VECTORS_FILE_NAME: &str = "vectors.bin";
pub const RECORDS_FILE_NAME: &str = "records.json";

/// Where one index keeps its two artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    dir: PathBuf,
}

impl StorePaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn vectors(&self) -> PathBuf {
        self.dir.join(VECTORS_FILE_NAME)
    }

    #[must_use]
    pub fn records(&self) -> PathBuf {
        self.dir.join(RECORDS_FILE_NAME)
    }
}

/// `path` with `.tmp` appended to its full file name.
#[must_use]
pub fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifacts_live_under_dir() {
        let paths = StorePaths::new("/tmp/store");
        assert_eq!(paths.vectors(), PathBuf::from("/tmp/store/vectors.bin"));
        assert_eq!(paths.records(), PathBuf::from("/tmp/store/records.json"));
        assert_eq!(
            tmp_sibling(&paths.records()),
            PathBuf::from("/tmp/store/records.json.tmp")
        );
    }
}
