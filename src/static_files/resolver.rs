//! Mapping request paths onto files under the document root.

use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Served when the request path is exactly `/`.
pub const DEFAULT_INDEX: &str = "index.html";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("path resolves outside the document root")]
    Forbidden,

    #[error("path does not name a regular file")]
    NotFound,

    #[error("failed to inspect path: {0}")]
    Io(#[from] io::Error),
}

/// Startup failures for the document root itself.
#[derive(Debug, Error)]
pub enum RootError {
    #[error("document root {} does not exist", .0.display())]
    Missing(PathBuf),

    #[error("document root {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to open document root {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// The directory every served file must live in.
///
/// Holds the canonical form of the directory, computed once at startup.
#[derive(Debug, Clone)]
pub struct DocumentRoot {
    path: PathBuf,
}

impl DocumentRoot {
    /// Canonicalizes `path` and checks that it is a directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RootError> {
        let path = path.as_ref();

        let canonical = path.canonicalize().map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => RootError::Missing(path.to_path_buf()),
            _ => RootError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;

        if !canonical.is_dir() {
            return Err(RootError::NotADirectory(canonical));
        }

        Ok(Self { path: canonical })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolves a decoded request path to a regular file inside the root.
    ///
    /// Traversal is rejected twice: lexically, before touching the filesystem,
    /// and again after canonicalization so that symlinks leading out of the
    /// root are caught.
    pub async fn resolve(&self, request_path: &str) -> Result<PathBuf, ResolveError> {
        let relative = if request_path == "/" {
            DEFAULT_INDEX
        } else {
            request_path.strip_prefix('/').unwrap_or(request_path)
        };

        let joined = self.join_confined(relative)?;

        let canonical = tokio::fs::canonicalize(&joined)
            .await
            .map_err(classify_io_error)?;

        // Path::starts_with compares whole components, so "/srv/www-evil" is
        // not inside "/srv/www"
        if !canonical.starts_with(&self.path) {
            return Err(ResolveError::Forbidden);
        }

        let metadata = tokio::fs::metadata(&canonical)
            .await
            .map_err(classify_io_error)?;

        if !metadata.is_file() {
            return Err(ResolveError::NotFound);
        }

        Ok(canonical)
    }

    /// Joins `relative` onto the root, refusing any component that would
    /// climb out of it.
    fn join_confined(&self, relative: &str) -> Result<PathBuf, ResolveError> {
        let mut joined = self.path.clone();
        let mut depth = 0usize;

        for component in Path::new(relative).components() {
            match component {
                Component::Normal(segment) => {
                    joined.push(segment);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    if depth == 0 {
                        return Err(ResolveError::Forbidden);
                    }
                    joined.pop();
                    depth -= 1;
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(ResolveError::Forbidden);
                }
            }
        }

        Ok(joined)
    }
}

fn classify_io_error(err: io::Error) -> ResolveError {
    match err.kind() {
        io::ErrorKind::NotFound
        | io::ErrorKind::NotADirectory
        | io::ErrorKind::InvalidInput => ResolveError::NotFound,
        _ => ResolveError::Io(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> DocumentRoot {
        DocumentRoot {
            path: PathBuf::from("/srv/www"),
        }
    }

    #[test]
    fn join_confined_normalizes_inside_root() {
        let joined = root().join_confined("a/./b/../c.txt").unwrap();
        assert_eq!(joined, PathBuf::from("/srv/www/a/c.txt"));
    }

    #[test]
    fn join_confined_rejects_climbing_out() {
        assert!(matches!(
            root().join_confined("../etc/passwd"),
            Err(ResolveError::Forbidden)
        ));
        assert!(matches!(
            root().join_confined("a/../../etc"),
            Err(ResolveError::Forbidden)
        ));
    }

    #[test]
    fn permission_denied_inside_root_is_io_error() {
        let err = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(matches!(classify_io_error(err), ResolveError::Io(_)));

        let err = io::Error::from(io::ErrorKind::NotADirectory);
        assert!(matches!(classify_io_error(err), ResolveError::NotFound));
    }

    #[test]
    fn join_confined_rejects_absolute_remainder() {
        assert!(matches!(
            root().join_confined("/etc/passwd"),
            Err(ResolveError::Forbidden)
        ));
    }
}
