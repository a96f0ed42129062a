//! Blocking-query timing.
//!
//! A blocking read is held by the server until the index moves past the
//! caller's value or the wait elapses, and the server adds up to `wait / 16`
//! of random jitter on top. The transport timeout has to outlast that or the
//! client would abort a perfectly healthy long poll.

use std::time::Duration;

/// Wait applied by the servers when a blocking read names no `wait`.
pub const SERVER_DEFAULT_WAIT: Duration = Duration::from_secs(5 * 60);

/// Slack on top of wait plus jitter for the response to make it back.
pub const RESPONSE_SLACK: Duration = Duration::from_secs(5);

/// Transport timeout for one request.
///
/// `wait` is `Some` only for blocking reads: the effective wait (option,
/// client default or [`SERVER_DEFAULT_WAIT`]). The result is never shorter
/// than `client_timeout`.
pub fn request_timeout(client_timeout: Duration, wait: Option<Duration>) -> Duration {
    match wait {
        Some(wait) => {
            let budget = wait
                .saturating_add(wait / 16)
                .saturating_add(RESPONSE_SLACK);
            client_timeout.max(budget)
        }
        None => client_timeout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_blocking_uses_client_timeout() {
        assert_eq!(
            request_timeout(Duration::from_secs(15), None),
            Duration::from_secs(15)
        );
    }

    #[test]
    fn long_wait_extends_timeout() {
        // 16 minutes + 1 minute jitter + 5 s
        let t = request_timeout(Duration::from_secs(60), Some(Duration::from_secs(16 * 60)));
        assert_eq!(t, Duration::from_secs(17 * 60 + 5));
    }

    #[test]
    fn short_wait_keeps_larger_client_timeout() {
        let t = request_timeout(Duration::from_secs(15 * 60), Some(Duration::from_secs(10)));
        assert_eq!(t, Duration::from_secs(15 * 60));
    }

    #[test]
    fn server_default_wait_budget() {
        let t = request_timeout(Duration::from_secs(1), Some(SERVER_DEFAULT_WAIT));
        assert_eq!(t, Duration::from_millis(300_000 + 18_750 + 5_000));
    }
}
