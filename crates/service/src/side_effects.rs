use std::fmt::Display;
use std::future::Future;

/// Run a non-critical write. Failures are logged at `warn` and swallowed;
/// the caller gets `None` and carries on.
pub async fn best_effort<T, E, F>(label: &'static str, fut: F) -> Option<T>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    match fut.await {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(error = %e, step = label, "Non-critical write failed, continuing");
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failure_becomes_none() {
        let out: Option<u8> = best_effort("test", async { Err::<u8, _>("boom") }).await;
        assert!(out.is_none());
        let out = best_effort("test", async { Ok::<_, String>(7) }).await;
        assert_eq!(out, Some(7));
    }
}
