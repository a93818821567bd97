use std::fmt;
use std::path::{Path, PathBuf};

use git2::{ErrorCode, Oid, Repository, Tree};
use tracing::debug;

use crate::error::GitError;

/// Content address of a commit, tree, or blob.
///
/// Only produced by revision resolution; callers cannot forge one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectAddress(Oid);

impl fmt::Display for ObjectAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An open repository.
///
/// Owns the native handle for its whole lifetime. Trees, diffs and status
/// lists borrow from it, so they are always released before the repository.
pub struct Repo {
    inner: Repository,
    path: PathBuf,
}

impl Repo {
    /// Open the repository rooted at `path`. Parent directories are not searched.
    pub fn open(path: &Path) -> Result<Self, GitError> {
        match Repository::open(path) {
            Ok(inner) => {
                debug!(path = %path.display(), "Opened repository");
                Ok(Self {
                    inner,
                    path: path.to_path_buf(),
                })
            }
            Err(e) if e.code() == ErrorCode::NotFound => {
                Err(GitError::NotARepository(path.to_path_buf()))
            }
            Err(e) => Err(GitError::RepositoryUnavailable(e.into())),
        }
    }

    /// Resolve a revision expression such as `HEAD~1` or `main@{1}`.
    pub fn resolve(&self, revspec: &str) -> Result<ObjectAddress, GitError> {
        let object =
            self.inner
                .revparse_single(revspec)
                .map_err(|e| GitError::UnresolvableReference {
                    revspec: revspec.to_string(),
                    error: e.into(),
                })?;

        Ok(ObjectAddress(object.id()))
    }

    /// Tree of the commit at `address`. Annotated tags are peeled to their commit.
    pub(crate) fn commit_tree(&self, address: ObjectAddress) -> Result<Tree<'_>, GitError> {
        let commit = self
            .inner
            .find_object(address.0, None)
            .and_then(|object| object.peel_to_commit())
            .map_err(|e| GitError::ObjectLookupFailed(e.into()))?;

        commit
            .tree()
            .map_err(|e| GitError::ObjectLookupFailed(e.into()))
    }

    pub(crate) fn revision_tree(&self, revspec: &str) -> Result<Tree<'_>, GitError> {
        let address = self.resolve(revspec)?;
        self.commit_tree(address)
    }

    /// Tree at HEAD, or `None` when the current branch has no commits yet.
    pub(crate) fn head_tree(&self) -> Result<Option<Tree<'_>>, GitError> {
        match self.inner.head() {
            Ok(head) => head
                .peel_to_tree()
                .map(Some)
                .map_err(|e| GitError::ObjectLookupFailed(e.into())),
            Err(e) if e.code() == ErrorCode::UnbornBranch => Ok(None),
            Err(e) => Err(GitError::UnresolvableReference {
                revspec: "HEAD".to_string(),
                error: e.into(),
            }),
        }
    }

    /// Raw content of `file` as recorded at `revspec`.
    pub fn blob_at(&self, revspec: &str, file: &str) -> Result<Vec<u8>, GitError> {
        let tree = self.revision_tree(revspec)?;

        let entry = tree
            .get_path(Path::new(file))
            .map_err(|e| GitError::ObjectLookupFailed(e.into()))?;

        let blob = self
            .inner
            .find_blob(entry.id())
            .map_err(|e| GitError::ObjectLookupFailed(e.into()))?;

        debug!(revspec, file, size = blob.size(), "Read blob");

        Ok(blob.content().to_vec())
    }

    pub(crate) fn inner(&self) -> &Repository {
        &self.inner
    }

    /// Release the repository. Taking `self` makes a second close unrepresentable.
    pub fn close(self) {
        debug!(path = %self.path.display(), "Closed repository");
    }
}
