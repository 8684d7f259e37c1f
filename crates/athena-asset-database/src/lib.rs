use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};

pub mod asset_paths;

pub trait Asset
where
    Self: Sized,
{
    fn load(file_path: &str, data: &[u8]) -> Result<Self>;
}

/// Loads assets from disk once and hands out shared references afterwards.
pub struct AssetDatabase<A: Asset> {
    assets: HashMap<PathBuf, Arc<A>>,
}

impl<A: Asset> Default for AssetDatabase<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Asset> AssetDatabase<A> {
    pub fn new() -> Self {
        Self {
            assets: HashMap::new(),
        }
    }

    pub fn get(&mut self, path: &Path) -> Result<Arc<A>> {
        athena_profiling::profile_function!();

        if let Some(asset) = self.assets.get(path) {
            Ok(asset.clone())
        } else {
            let data = fs::read(path).with_context(|| format!("read asset: {}", path.display()))?;
            log::debug!("Loaded {} ({} bytes)", path.display(), data.len());

            let asset = Arc::new(
                A::load(&path.to_string_lossy(), &data)
                    .with_context(|| format!("load asset: {}", path.display()))?,
            );

            self.assets.insert(path.to_owned(), asset.clone());
            Ok(asset)
        }
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ByteCount(usize);

    impl Asset for ByteCount {
        fn load(_file_path: &str, data: &[u8]) -> Result<Self> {
            Ok(ByteCount(data.len()))
        }
    }

    #[test]
    fn loads_once_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("asset.bin");
        fs::write(&path, [1u8, 2, 3]).unwrap();

        let mut database = AssetDatabase::<ByteCount>::new();
        let first = database.get(&path).unwrap();
        fs::write(&path, [1u8]).unwrap();
        let second = database.get(&path).unwrap();

        assert_eq!(first.0, 3);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(database.len(), 1);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut database = AssetDatabase::<ByteCount>::new();
        assert!(database.get(&dir.path().join("missing.glb")).is_err());
        assert!(database.is_empty());
    }
}
