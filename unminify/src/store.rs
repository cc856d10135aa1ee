use std::{
    io::Cursor,
    path::{Component, Path, PathBuf},
    time::SystemTime,
};

use tracing::{info, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

use crate::{
    error::StoreError,
    metric_consts::{ARCHIVE_ENTRIES_EXTRACTED, MAPS_LISTED, STORE_SCAN_ERRORS},
};

const MAP_EXTENSION: &str = "map";

/// A directory tree of source map files. Maps are identified by their `/`-separated
/// path relative to the root.
#[derive(Debug, Clone)]
pub struct MapStore {
    root: PathBuf,
}

struct ListedMap {
    id: String,
    created: SystemTime,
}

impl MapStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every map under the root whose identifier contains `version` (when given),
    /// newest first. Anything we can't read is logged and skipped rather than failing
    /// the whole listing.
    pub async fn list_maps(&self, version: Option<&str>) -> Result<Vec<String>, StoreError> {
        let root = self.root.clone();
        let version = version.filter(|v| !v.is_empty()).map(str::to_string);
        let maps = tokio::task::spawn_blocking(move || scan(&root, version.as_deref())).await?;
        metrics::histogram!(MAPS_LISTED).record(maps.len() as f64);
        Ok(maps)
    }

    /// Turn a map identifier into a path under the root, refusing anything that could
    /// point outside of it.
    pub fn locate(&self, id: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(id);
        if id.is_empty() || relative.is_absolute() {
            return Err(StoreError::InvalidPath(id.to_string()));
        }
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => return Err(StoreError::InvalidPath(id.to_string())),
            }
        }
        Ok(self.root.join(relative))
    }

    pub async fn read_map_file(&self, id: &str) -> Result<String, StoreError> {
        let path = self.locate(id)?;
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| not_found_or_io(e, id))
    }

    pub async fn stat(&self, id: &str) -> Result<(PathBuf, SystemTime), StoreError> {
        let path = self.locate(id)?;
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| not_found_or_io(e, id))?;
        if !metadata.is_file() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok((path, metadata.modified()?))
    }

    /// Store a single uploaded map at the root, under its base name. Returns the new
    /// map's identifier.
    pub async fn store_map(&self, file_name: &str, data: &[u8]) -> Result<String, StoreError> {
        let name = base_name(file_name)?;
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(&name);
        tokio::fs::write(&path, data).await?;
        info!("Stored map file at {}", path.display());
        Ok(name)
    }

    /// Extract a zip archive into a directory named after the archive, so
    /// `release-1.2.zip` ends up under `<root>/release-1.2/`. Returns the identifiers of
    /// the files written.
    pub async fn extract_archive(
        &self,
        archive_name: &str,
        data: Vec<u8>,
    ) -> Result<Vec<String>, StoreError> {
        let name = base_name(archive_name)?;
        let stem = Path::new(&name)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| StoreError::InvalidPath(archive_name.to_string()))?;
        let target = self.root.join(&stem);

        let extracted = tokio::task::spawn_blocking({
            let target = target.clone();
            move || extract(data, &target)
        })
        .await??;

        metrics::counter!(ARCHIVE_ENTRIES_EXTRACTED).increment(extracted.len() as u64);
        info!(
            "Extracted {} files from {} into {}",
            extracted.len(),
            archive_name,
            target.display()
        );
        Ok(extracted
            .into_iter()
            .map(|relative| format!("{}/{}", stem, relative))
            .collect())
    }
}

fn not_found_or_io(err: std::io::Error, id: &str) -> StoreError {
    match err.kind() {
        std::io::ErrorKind::NotFound => StoreError::NotFound(id.to_string()),
        _ => StoreError::Io(err),
    }
}

fn base_name(file_name: &str) -> Result<String, StoreError> {
    // Browsers sometimes send Windows paths as the file name
    let last = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match Path::new(last).components().next() {
        Some(Component::Normal(name)) if name == last => Ok(last.to_string()),
        _ => Err(StoreError::InvalidPath(file_name.to_string())),
    }
}

fn slash_separated(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn scan(root: &Path, version: Option<&str>) -> Vec<String> {
    let mut found = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                metrics::counter!(STORE_SCAN_ERRORS).increment(1);
                warn!("Error while reading {}: {}", root.display(), e);
                continue;
            }
        };

        if !entry.file_type().is_file()
            || entry.path().extension().map_or(true, |e| e != MAP_EXTENSION)
        {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let id = slash_separated(relative);

        if version.is_some_and(|v| !id.contains(v)) {
            continue;
        }

        let created = match entry.metadata() {
            Ok(meta) => meta
                .created()
                .or_else(|_| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH),
            Err(e) => {
                metrics::counter!(STORE_SCAN_ERRORS).increment(1);
                warn!("Could not stat {}: {}", entry.path().display(), e);
                continue;
            }
        };

        found.push(ListedMap { id, created });
    }

    // Stable, so maps created at the same instant keep their walk order
    found.sort_by(|a, b| b.created.cmp(&a.created));
    found.into_iter().map(|m| m.id).collect()
}

fn extract(data: Vec<u8>, target: &Path) -> Result<Vec<String>, StoreError> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;
    std::fs::create_dir_all(target)?;

    let mut written = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let Some(relative) = file.enclosed_name() else {
            warn!("Skipping archive entry with unsafe path: {}", file.name());
            continue;
        };
        let out_path = target.join(&relative);

        if file.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = std::fs::File::create(&out_path)?;
        std::io::copy(&mut file, &mut out)?;
        written.push(slash_separated(&relative));
    }

    Ok(written)
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use tempfile::tempdir;
    use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

    use super::*;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn zip_of(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, contents) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[tokio::test]
    async fn lists_maps_recursively() {
        let dir = tempdir().unwrap();
        write(dir.path(), "app.js.map", "{}");
        write(dir.path(), "v1.2.0/main.js.map", "{}");
        write(dir.path(), "v1.2.0/nested/vendor.js.map", "{}");
        write(dir.path(), "v1.2.0/main.js", "");
        write(dir.path(), "v1.3.0/main.js.map", "{}");

        let store = MapStore::new(dir.path());
        let mut all = store.list_maps(None).await.unwrap();
        all.sort();
        assert_eq!(
            all,
            vec![
                "app.js.map",
                "v1.2.0/main.js.map",
                "v1.2.0/nested/vendor.js.map",
                "v1.3.0/main.js.map",
            ]
        );

        let mut filtered = store.list_maps(Some("v1.2.0")).await.unwrap();
        filtered.sort();
        assert_eq!(
            filtered,
            vec!["v1.2.0/main.js.map", "v1.2.0/nested/vendor.js.map"]
        );

        // An empty filter is no filter
        assert_eq!(store.list_maps(Some("")).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn lists_newest_first() {
        let dir = tempdir().unwrap();
        // Written out of name order, so the walk order can't pass for the right answer
        for id in ["m/c.js.map", "a.js.map", "z/b.js.map"] {
            write(dir.path(), id, "{}");
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }

        let store = MapStore::new(dir.path());
        assert_eq!(
            store.list_maps(None).await.unwrap(),
            vec!["z/b.js.map", "a.js.map", "m/c.js.map"]
        );
        assert_eq!(
            store.list_maps(Some("c.js")).await.unwrap(),
            vec!["m/c.js.map"]
        );
    }

    #[tokio::test]
    async fn missing_root_lists_nothing() {
        let dir = tempdir().unwrap();
        let store = MapStore::new(dir.path().join("nope"));
        assert!(store.list_maps(None).await.unwrap().is_empty());
    }

    #[test]
    fn locate_rejects_escapes() {
        let store = MapStore::new("/srv/maps");
        assert_eq!(
            store.locate("v1/app.js.map").unwrap(),
            PathBuf::from("/srv/maps/v1/app.js.map")
        );
        for id in ["", "../secrets.map", "v1/../../x.map", "/etc/passwd"] {
            assert!(
                matches!(store.locate(id), Err(StoreError::InvalidPath(_))),
                "{}",
                id
            );
        }
    }

    #[tokio::test]
    async fn read_missing_map_is_not_found() {
        let dir = tempdir().unwrap();
        let store = MapStore::new(dir.path());
        let err = store.read_map_file("missing.js.map").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        let err = store.stat("missing.js.map").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn stores_uploaded_maps_by_base_name() {
        let dir = tempdir().unwrap();
        let store = MapStore::new(dir.path().join("maps"));

        let id = store
            .store_map("C:\\build\\out\\app.js.map", b"{\"version\":3}")
            .await
            .unwrap();
        assert_eq!(id, "app.js.map");
        assert_eq!(
            store.read_map_file("app.js.map").await.unwrap(),
            "{\"version\":3}"
        );

        assert!(matches!(
            store.store_map("..", b"").await,
            Err(StoreError::InvalidPath(_))
        ));
        assert!(matches!(
            store.store_map("dir/", b"").await,
            Err(StoreError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn extracts_archives_into_named_directory() {
        let dir = tempdir().unwrap();
        let store = MapStore::new(dir.path());
        let data = zip_of(&[
            ("main.js.map", "{}"),
            ("chunks/vendor.js.map", "{}"),
            ("../escape.js.map", "{}"),
        ]);

        let mut written = store
            .extract_archive("release-1.4.zip", data)
            .await
            .unwrap();
        written.sort();
        assert_eq!(
            written,
            vec!["release-1.4/chunks/vendor.js.map", "release-1.4/main.js.map"]
        );

        let mut maps = store.list_maps(Some("release-1.4")).await.unwrap();
        maps.sort();
        assert_eq!(
            maps,
            vec!["release-1.4/chunks/vendor.js.map", "release-1.4/main.js.map"]
        );
        assert!(!dir.path().join("escape.js.map").exists());
    }

    #[tokio::test]
    async fn rejects_corrupt_archives() {
        let dir = tempdir().unwrap();
        let store = MapStore::new(dir.path());
        let err = store
            .extract_archive("bad.zip", b"not a zip".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Zip(_)));
    }
}
