//! Link tree materialization for data-based matches.
//!
//! When a match was found via a directory scan there is no torrent file
//! pointing at the data, so the injector mirrors the entity's structure
//! under the link directory, one link per constituent file, and hands
//! the client that tree as the save path.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::searchee::Searchee;

use super::InjectorError;

/// Which kind of filesystem link to create.
///
/// The configured type is used exactly; a failure (e.g. a hard link
/// across filesystems) is fatal for that match rather than silently
/// degrading to the other type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    #[default]
    Symlink,
    Hardlink,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Symlink => "symlink",
            LinkType::Hardlink => "hardlink",
        }
    }
}

/// Create the link tree for `searchee` under `link_dir`.
///
/// Returns the tree root. The subtree name is unique per distinct
/// (name, file-structure) combination, so a structurally different
/// re-match of the same name lands in a fresh tree instead of
/// colliding with the old one.
pub async fn materialize_link_tree(
    searchee: &Searchee,
    link_dir: &Path,
    link_type: LinkType,
) -> Result<PathBuf, InjectorError> {
    let tree_root = link_dir.join(format!(
        "{}-{}",
        searchee.name,
        structure_digest(searchee)
    ));

    for file in &searchee.files {
        let source = searchee.save_path.join(&file.path);
        let target = tree_root.join(&file.path);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| InjectorError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        if fs::symlink_metadata(&target).await.is_ok() {
            // Re-running a match against an unchanged structure is fine
            continue;
        }

        let result = match link_type {
            LinkType::Hardlink => fs::hard_link(&source, &target).await,
            #[cfg(unix)]
            LinkType::Symlink => fs::symlink(&source, &target).await,
            #[cfg(windows)]
            LinkType::Symlink => fs::symlink_file(&source, &target).await,
        };

        result.map_err(|e| InjectorError::LinkFailed {
            link_type: link_type.as_str(),
            source_path: source,
            target,
            reason: e.to_string(),
        })?;
    }

    Ok(tree_root)
}

/// Short digest over the sorted relative path/size listing.
fn structure_digest(searchee: &Searchee) -> String {
    let mut listing: Vec<String> = searchee
        .files
        .iter()
        .map(|f| format!("{}:{}", f.path.display(), f.size_bytes))
        .collect();
    listing.sort();

    let digest = Sha256::digest(listing.join("\n").as_bytes());
    let hex = format!("{:x}", digest);
    hex[..12].to_string()
}
