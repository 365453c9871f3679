//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::CoreError;

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &CoreError) -> String {
    match e {
        CoreError::Transport(err) if err.status.is_none() => {
            format!("{} (is the API reachable? see --api-base)", e)
        }
        _ => e.to_string(),
    }
}
