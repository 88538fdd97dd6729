//! Directory-scan origin: entries found up to `max_data_depth` levels
//! below each data directory become candidate entities with no info hash.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

use super::filter::classify;
use super::types::data_entity_id;
use super::{ScannedEntity, SearcheeError, SearcheeFile};

/// Scan one data directory.
///
/// Every file or directory at depth 1..=`max_depth` becomes one entity:
/// a season pack directory at depth 1 is an entity, and with depth >= 2
/// each episode file inside it is an entity of its own.
pub(super) async fn scan_data_dir(
    dir: &Path,
    max_depth: usize,
) -> Result<Vec<ScannedEntity>, SearcheeError> {
    let category = dir
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_string());

    let mut entities = Vec::new();
    // Frontier of directories whose children sit at the next depth.
    let mut frontier: Vec<PathBuf> = vec![dir.to_path_buf()];

    for depth in 1..=max_depth {
        let mut next_frontier = Vec::new();

        for parent in &frontier {
            let parent_name = if depth == 1 {
                // Direct children of the data dir are standalone releases
                None
            } else {
                parent.file_name().and_then(|n| n.to_str()).map(String::from)
            };

            let mut entries = match fs::read_dir(parent).await {
                Ok(entries) => entries,
                Err(source) => {
                    if parent == dir {
                        return Err(SearcheeError::Io {
                            path: dir.to_path_buf(),
                            source,
                        });
                    }
                    warn!("Skipping unreadable directory {}: {}", parent.display(), source);
                    continue;
                }
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|source| SearcheeError::Io {
                    path: parent.clone(),
                    source,
                })?
            {
                let path = entry.path();
                let metadata = entry.metadata().await.map_err(|source| SearcheeError::Io {
                    path: path.clone(),
                    source,
                })?;

                match entity_from_path(&path, metadata.is_dir(), metadata.len()).await {
                    Ok(Some((name, files))) => {
                        let kind = classify(&name, &files, parent_name.as_deref());
                        entities.push(ScannedEntity {
                            id: data_entity_id(&path),
                            name,
                            files,
                            info_hash: None,
                            category: category.clone(),
                            save_path: parent.clone(),
                            kind,
                        });
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!("Skipping {}: {}", path.display(), e);
                    }
                }

                if metadata.is_dir() && depth < max_depth {
                    next_frontier.push(path);
                }
            }
        }

        frontier = next_frontier;
    }

    Ok(entities)
}

/// Build the (name, file list) pair for one scanned path, or `None` for
/// entries that cannot represent a release (empty directories).
async fn entity_from_path(
    path: &Path,
    is_dir: bool,
    file_size: u64,
) -> Result<Option<(String, Vec<SearcheeFile>)>, SearcheeError> {
    if is_dir {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n.to_string(),
            None => return Ok(None),
        };
        let files = collect_tree(path).await?;
        if files.is_empty() {
            return Ok(None);
        }
        Ok(Some((name, files)))
    } else {
        let file_name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n.to_string(),
            None => return Ok(None),
        };
        // Release name without the extension; the file keeps it
        let name = path
            .file_stem()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string())
            .unwrap_or_else(|| file_name.clone());
        Ok(Some((
            name,
            vec![SearcheeFile {
                path: PathBuf::from(file_name),
                size_bytes: file_size,
            }],
        )))
    }
}

/// Collect every file below `root`, with paths relative to the parent of
/// `root` (so they start with the root directory's own name).
async fn collect_tree(root: &Path) -> Result<Vec<SearcheeFile>, SearcheeError> {
    let base = root.parent().unwrap_or(root);
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let mut entries = fs::read_dir(&dir).await.map_err(|source| SearcheeError::Io {
            path: dir.clone(),
            source,
        })?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| SearcheeError::Io {
                path: dir.clone(),
                source,
            })?
        {
            let path = entry.path();
            let metadata = entry.metadata().await.map_err(|source| SearcheeError::Io {
                path: path.clone(),
                source,
            })?;

            if metadata.is_dir() {
                stack.push(path);
            } else {
                let rel = path
                    .strip_prefix(base)
                    .unwrap_or(&path)
                    .to_path_buf();
                files.push(SearcheeFile {
                    path: rel,
                    size_bytes: metadata.len(),
                });
            }
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}
