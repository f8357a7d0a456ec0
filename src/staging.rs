//! Content staging.
//!
//! Resolves the local files to add into an ordered list of target path and
//! byte content. Staging happens once per run, before any remote call, and the
//! result is shared read-only by every branch transaction.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while staging local content.
#[derive(Debug, Error)]
pub enum StagingError {
    #[error("no files to add")]
    NoFiles,

    #[error("{} has no file name", .0.display())]
    NoFileName(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("two inputs would both be written to {0:?}")]
    DuplicatePath(String),
}

/// A local input: its file name and bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub content: Vec<u8>,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        LocalFile {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Reads a file from disk, naming it by its last path component.
    pub fn read(path: &Path) -> Result<Self, StagingError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| StagingError::NoFileName(path.to_path_buf()))?;
        let content = std::fs::read(path).map_err(|source| StagingError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(LocalFile { name, content })
    }
}

/// One file to write: its path in the repository and its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    pub path: String,
    pub content: Vec<u8>,
}

/// The ordered, duplicate-free set of content items for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedContent {
    items: Vec<ContentItem>,
    file_names: Vec<String>,
}

impl StagedContent {
    /// Items in commit order.
    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    /// The local file names, in input order.
    pub fn file_names(&self) -> &[String] {
        &self.file_names
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Normalizes a destination prefix to end with `/`, unless it is empty.
pub fn normalize_prefix(destination: &str) -> String {
    if destination.is_empty() || destination.ends_with('/') {
        destination.to_string()
    } else {
        format!("{}/", destination)
    }
}

/// Stages local files under the destination prefix, preserving input order.
///
/// Two inputs that resolve to the same target path are rejected: the second
/// write would silently replace the first within the same topic branch.
pub fn stage(files: Vec<LocalFile>, destination: &str) -> Result<StagedContent, StagingError> {
    if files.is_empty() {
        return Err(StagingError::NoFiles);
    }

    let prefix = normalize_prefix(destination);
    let mut seen = HashSet::new();
    let mut items = Vec::with_capacity(files.len());
    let mut file_names = Vec::with_capacity(files.len());

    for file in files {
        let path = format!("{}{}", prefix, file.name);
        if !seen.insert(path.clone()) {
            return Err(StagingError::DuplicatePath(path));
        }
        tracing::debug!(path = %path, bytes = file.content.len(), "Staged content");
        items.push(ContentItem {
            path,
            content: file.content,
        });
        file_names.push(file.name);
    }

    Ok(StagedContent { items, file_names })
}

/// Reads and stages the given local paths.
pub fn stage_paths<P: AsRef<Path>>(
    paths: &[P],
    destination: &str,
) -> Result<StagedContent, StagingError> {
    let files = paths
        .iter()
        .map(|p| LocalFile::read(p.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    stage(files, destination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    #[test]
    fn prefix_is_normalized() {
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("docs"), "docs/");
        assert_eq!(normalize_prefix("docs/"), "docs/");
        assert_eq!(normalize_prefix(".github/workflows"), ".github/workflows/");
    }

    #[test]
    fn readme_and_license_under_docs() {
        let staged = stage(
            vec![
                LocalFile::new("README.md", "# Title"),
                LocalFile::new("LICENSE", "MIT"),
            ],
            "docs/",
        )
        .unwrap();

        let paths: Vec<_> = staged.items().iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["docs/README.md", "docs/LICENSE"]);
        assert_eq!(staged.file_names(), ["README.md", "LICENSE"]);
        assert_eq!(staged.items()[1].content, b"MIT");
    }

    #[test]
    fn empty_prefix_uses_bare_names() {
        let staged = stage(vec![LocalFile::new("CODEOWNERS", "* @org/team")], "").unwrap();
        assert_eq!(staged.items()[0].path, "CODEOWNERS");
    }

    #[test]
    fn duplicate_targets_are_rejected() {
        let err = stage(
            vec![LocalFile::new("README.md", "a"), LocalFile::new("README.md", "b")],
            "docs",
        )
        .unwrap_err();
        assert!(matches!(err, StagingError::DuplicatePath(p) if p == "docs/README.md"));
    }

    #[test]
    fn no_files_is_an_error() {
        assert!(matches!(stage(vec![], "docs"), Err(StagingError::NoFiles)));
    }

    #[test]
    fn stage_paths_reads_from_disk() {
        let dir = tempdir().unwrap();
        let readme = dir.path().join("README.md");
        let license = dir.path().join("LICENSE");
        std::fs::write(&readme, "hello").unwrap();
        std::fs::write(&license, [0u8, 159, 146, 150]).unwrap();

        let staged = stage_paths(&[readme, license], "").unwrap();
        assert_eq!(staged.len(), 2);
        assert_eq!(staged.items()[0].content, b"hello");
        assert_eq!(staged.items()[1].content, vec![0u8, 159, 146, 150]);
    }

    #[test]
    fn stage_paths_reports_missing_file() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.txt");
        let err = stage_paths(&[missing.clone()], "").unwrap_err();
        assert!(matches!(err, StagingError::Read { path, .. } if path == missing));
    }

    proptest! {
        #[test]
        fn staging_preserves_input_order(
            names in prop::collection::hash_set("[a-z]{1,8}\\.txt", 1..10),
            prefix in "[a-z]{0,6}",
        ) {
            let names: Vec<String> = names.into_iter().collect();
            let files = names.iter().map(|n| LocalFile::new(n.clone(), n.as_bytes())).collect();
            let staged = stage(files, &prefix).unwrap();

            let expected_prefix = normalize_prefix(&prefix);
            prop_assert_eq!(staged.len(), names.len());
            for (item, name) in staged.items().iter().zip(&names) {
                prop_assert_eq!(&item.path, &format!("{}{}", expected_prefix, name));
                prop_assert_eq!(&item.content, &name.as_bytes().to_vec());
            }
        }
    }
}
