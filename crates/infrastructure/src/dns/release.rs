use std::sync::Arc;
use std::time::Duration;

const RELEASE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Wait until `shared` is the last handle to its value, then take the value.
///
/// Used after a generation swap: readers that loaded the old generation
/// finish with it undisturbed, and cleanup only runs once they are gone.
pub async fn wait_for_release<T>(mut shared: Arc<T>) -> T {
    loop {
        match Arc::try_unwrap(shared) {
            Ok(inner) => return inner,
            Err(still_shared) => {
                shared = still_shared;
                tokio::time::sleep(RELEASE_POLL_INTERVAL).await;
            }
        }
    }
}
