//! Progress of an asynchronously loaded asset.

use std::fmt::Display;

/// An asset that is still on its way, arrived, or never will.
#[derive(Debug, Default)]
pub enum LoadState<T> {
    #[default]
    Pending,
    Ready(T),
    Failed(String),
}

impl<T> LoadState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, LoadState::Pending)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, LoadState::Ready(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, LoadState::Failed(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            LoadState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn ready_mut(&mut self) -> Option<&mut T> {
        match self {
            LoadState::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Build the final state from the result of a load.
    pub fn from_result<E: Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => LoadState::Ready(value),
            Err(e) => LoadState::Failed(format!("{:#}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_and_failed_are_distinguishable() {
        let pending: LoadState<u32> = LoadState::default();
        assert!(pending.is_pending());
        assert!(!pending.is_failed());

        let failed: LoadState<u32> =
            LoadState::from_result(Err(anyhow::anyhow!("404 Not Found")));
        assert!(failed.is_failed());
        assert!(!failed.is_pending());
        assert!(failed.ready().is_none());
        match failed {
            LoadState::Failed(reason) => assert!(reason.contains("404")),
            _ => unreachable!(),
        }
    }

    #[test]
    fn ready_exposes_value() {
        let mut state = LoadState::<u32>::from_result::<anyhow::Error>(Ok(7));
        assert!(state.is_ready());
        *state.ready_mut().unwrap() += 1;
        assert_eq!(state.ready(), Some(&8));
    }
}
