// Core error type and shared helpers for the per-environment bookkeeping crate.

/// Errors raised by the bookkeeping components.
///
/// All of these are synchronous contract violations; none is worth retrying.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RansError {
    #[error("Environment index {index} out of range (num_envs = {num_envs})")]
    OutOfRange { index: usize, num_envs: usize },
    #[error("Object pool exhausted for environment {env} (capacity {capacity})")]
    PoolExhausted { env: usize, capacity: usize },
    #[error("Stale object slot: env {env}, slot {id}")]
    StaleSlot { env: usize, id: usize },
    #[error("Invalid track configuration: {0}")]
    InvalidTrackConfig(String),
    #[error("Robot name already registered: {0}")]
    DuplicateName(String),
    #[error("Unknown robot: {0}")]
    UnknownRobot(String),
    #[error("Unknown RNG channel: {0}")]
    UnknownChannel(String),
    #[error("Invalid distribution parameters: {0}")]
    InvalidDistribution(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Convenience alias for results using RansError.
pub type Result<T> = std::result::Result<T, RansError>;

/// Fail with `OutOfRange` unless `index < num_envs`.
#[inline]
pub fn check_env(index: usize, num_envs: usize) -> Result<()> {
    if index < num_envs {
        Ok(())
    } else {
        Err(RansError::OutOfRange { index, num_envs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_env_bounds() {
        assert!(check_env(0, 1).is_ok());
        assert_eq!(check_env(3, 3), Err(RansError::OutOfRange { index: 3, num_envs: 3 }));
        assert!(check_env(0, 0).is_err());
    }

    #[test]
    fn errors_render_context() {
        let e = RansError::PoolExhausted { env: 2, capacity: 4 };
        assert_eq!(e.to_string(), "Object pool exhausted for environment 2 (capacity 4)");
    }
}
