//! Errors raised when a bulk operation cannot start or a single-item
//! operation fails.

use wpbm_client::{ApiError, PluginState};

#[derive(Debug, thiserror::Error)]
pub enum OpsError {
    /// Invalid input parameters (e.g., empty search string).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Plugin is not in a state that allows the action.
    #[error("PLUGIN_STATE: cannot {action} {plugin_file} while it is {state}")]
    PluginState { plugin_file: String, state: PluginState, action: &'static str },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Core(#[from] wpbm_core::Error),

    #[error("IO_ERROR: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OpsError::PluginState {
            plugin_file: "akismet/akismet.php".into(),
            state: PluginState::Active,
            action: "delete",
        };
        assert_eq!(err.to_string(), "PLUGIN_STATE: cannot delete akismet/akismet.php while it is active");

        let err: OpsError = ApiError::Timeout.into();
        assert!(err.to_string().starts_with("TIMEOUT"));
    }
}
