/// Configures HTTP timeout and retry behavior of the engine client.
///
/// Retries happen inside the native client only. The `*_effect` entry points
/// never retry on their own.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Base retry backoff in milliseconds (exponential strategy).
    pub retry_backoff_ms: u64,
}

impl ClientOptions {
    /// Backoff before retry number `attempt` (zero based), capped at 2^16 times the base.
    pub fn backoff_ms(&self, attempt: usize) -> u64 {
        let exp = attempt.min(16) as u32;
        self.retry_backoff_ms.saturating_mul(1u64 << exp)
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_retries: 0,
            retry_backoff_ms: 250,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ClientOptions;

    #[test]
    fn backoff_doubles_and_saturates() {
        let opts = ClientOptions {
            retry_backoff_ms: 100,
            ..ClientOptions::default()
        };
        assert_eq!(opts.backoff_ms(0), 100);
        assert_eq!(opts.backoff_ms(3), 800);
        assert_eq!(opts.backoff_ms(40), opts.backoff_ms(16));

        let huge = ClientOptions {
            retry_backoff_ms: u64::MAX,
            ..ClientOptions::default()
        };
        assert_eq!(huge.backoff_ms(2), u64::MAX);
    }
}
