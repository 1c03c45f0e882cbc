//! Bounded polling for conditions owned by the host viewer.

use std::time::Duration;

use log::debug;

use crate::error::MprError;

/// Call `check` until it yields a value, sleeping `interval` between calls.
///
/// Fails with [`MprError::Timeout`] after `max_attempts` unsuccessful
/// checks instead of waiting forever.
pub async fn poll_until<T>(
    what: &str,
    interval: Duration,
    max_attempts: u32,
    mut check: impl FnMut() -> Option<T>,
) -> Result<T, MprError> {
    for attempt in 1..=max_attempts {
        if let Some(value) = check() {
            return Ok(value);
        }
        debug!("{what} not ready (attempt {attempt}/{max_attempts})");
        if attempt < max_attempts {
            tokio::time::sleep(interval).await;
        }
    }
    Err(MprError::Timeout {
        what: what.to_string(),
        attempts: max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn returns_once_check_succeeds() {
        let mut calls = 0;
        let value = poll_until("image", Duration::from_millis(250), 15, || {
            calls += 1;
            (calls == 3).then_some(calls)
        })
        .await
        .unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let mut calls = 0;
        let result: Result<(), _> = poll_until("element", Duration::from_millis(250), 15, || {
            calls += 1;
            None
        })
        .await;
        assert!(matches!(result, Err(MprError::Timeout { attempts: 15, .. })));
        assert_eq!(calls, 15);
    }
}
