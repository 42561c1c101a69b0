//! Build identifier discovery
//!
//! The identifier is the abbreviated commit `HEAD` points at in the git
//! repository containing the workspace root.

use std::path::Path;

/// Length of the abbreviated commit hash used as build identifier
pub const SHORT_HASH_LEN: usize = 7;

/// Read the abbreviated commit hash checked out at `root`
///
/// Returns `None` when `root` is not inside a git repository or `HEAD`
/// cannot be resolved (e.g. an unborn branch).
pub fn read_head_commit(root: &Path) -> Option<String> {
    let repo = match gix::discover(root) {
        Ok(repo) => repo,
        Err(e) => {
            tracing::debug!(root = %root.display(), error = %e, "no git repository");
            return None;
        }
    };

    let head = match repo.head() {
        Ok(head) => head,
        Err(e) => {
            tracing::debug!(git_dir = %repo.git_dir().display(), error = %e, "unreadable HEAD");
            return None;
        }
    };

    // Symbolic and detached heads carry the commit id directly
    let Some(id) = head.id() else {
        tracing::debug!(git_dir = %repo.git_dir().display(), "HEAD is unborn");
        return None;
    };

    Some(id.to_hex_with_len(SHORT_HASH_LEN).to_string())
}
