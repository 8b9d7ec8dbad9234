//! Depth-first walk over the remote folder tree.

use crate::client::Client;
use crate::error::SyncError;
use crate::types::RemoteNode;
use tracing::{debug, warn};

/// One visited remote folder and its immediate children, in listing order.
#[derive(Debug, Clone)]
pub struct Visit {
    pub path: String,
    pub dirs: Vec<RemoteNode>,
    pub files: Vec<RemoteNode>,
}

/// Joins a remote path and a child name with a single `/`.
pub fn join_remote_path(path: &str, name: &str) -> String {
    if path.ends_with('/') {
        format!("{}{}", path, name)
    } else {
        format!("{}/{}", path, name)
    }
}

/// Lazily walks the remote tree, one folder per [`TreeWalker::next_dir`] call.
///
/// Children of a visited folder are only descended into on the following
/// call, so the caller can [`claim`](TreeWalker::claim) subfolders in
/// between; claimed folders are never listed by the walker.
///
/// Remote trees are assumed acyclic.
///
/// # Example
///
/// ```no_run
/// use putsync::{Client, TreeWalker};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::new("token")?;
/// let root = client.get(0).await?;
/// let mut walker = TreeWalker::new(&client, "/", root);
/// while let Some(visit) = walker.next_dir().await? {
///     for dir in &visit.dirs {
///         if dir.name == "Trash" {
///             walker.claim(dir.id);
///         }
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct TreeWalker<'a> {
    client: &'a Client,
    stack: Vec<(String, RemoteNode)>,
    pending: Option<(String, Vec<RemoteNode>)>,
}

impl<'a> TreeWalker<'a> {
    /// Starts a walk at `anchor`, which is given the path `path`.
    pub fn new(client: &'a Client, path: impl Into<String>, anchor: RemoteNode) -> Self {
        Self {
            client,
            stack: vec![(path.into(), anchor)],
            pending: None,
        }
    }

    /// Excludes a subfolder of the most recent visit from the walk.
    ///
    /// Returns `false` if `id` is not an unclaimed subfolder of that visit.
    pub fn claim(&mut self, id: u64) -> bool {
        let Some((_, dirs)) = self.pending.as_mut() else {
            return false;
        };
        let before = dirs.len();
        dirs.retain(|d| d.id != id);
        dirs.len() != before
    }

    /// Lists the next folder in depth-first order.
    ///
    /// A folder that fails to list is dropped from the walk along with its
    /// subtree; calling again continues with the next folder.
    pub async fn next_dir(&mut self) -> Result<Option<Visit>, SyncError> {
        if let Some((parent, dirs)) = self.pending.take() {
            // Reversed so the first listed child is visited first.
            for dir in dirs.into_iter().rev() {
                let child_path = join_remote_path(&parent, &dir.name);
                self.stack.push((child_path, dir));
            }
        }

        let Some((path, node)) = self.stack.pop() else {
            return Ok(None);
        };

        let children = match node.children(self.client).await {
            Ok(children) => children,
            Err(e) => {
                warn!("Cannot list {}: {}", path, e);
                return Err(e);
            }
        };
        let (dirs, files): (Vec<_>, Vec<_>) = children.into_iter().partition(RemoteNode::is_dir);
        debug!(
            "Visiting {} ({} folders, {} files)",
            path,
            dirs.len(),
            files.len()
        );

        self.pending = Some((path.clone(), dirs.clone()));
        Ok(Some(Visit { path, dirs, files }))
    }
}
