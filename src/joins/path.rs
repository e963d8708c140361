//! Join path validation.

use std::collections::HashSet;

use crate::error::{CompileError, CompileResult};
use crate::model::{JoinPath, PathNode};

/// Returns true if any path revisits a table it has already reached.
///
/// Each path is checked on its own; the visited set starts with the path's
/// origin. Paths made only of single nodes never loop.
pub fn check_loop_in_join_path(paths: &[JoinPath]) -> bool {
    paths.iter().any(path_has_loop)
}

fn path_has_loop(path: &JoinPath) -> bool {
    let Some(origin) = path.origin() else {
        return false;
    };

    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(origin);

    for node in path.nodes() {
        match node {
            PathNode::Join(join) => {
                if !visited.insert(join.right.as_str()) {
                    return true;
                }
            }
            PathNode::Single(_) => {}
        }
    }

    false
}

/// Reject join paths containing a cycle.
pub fn validate_join_paths(paths: &[JoinPath]) -> CompileResult<()> {
    if check_loop_in_join_path(paths) {
        let rendered: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
        return Err(CompileError::LoopDetected(rendered.join(", ")));
    }
    Ok(())
}
