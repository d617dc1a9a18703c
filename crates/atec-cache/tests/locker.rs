use std::sync::Arc;
use std::time::Duration;

use atec_cache::memory::MemoryBackend;
use atec_cache::{CacheError, Locker, RateLimit, RateLimiter};

#[tokio::test]
async fn second_claim_is_rejected_until_release() {
    let locker = Locker::new(Arc::new(MemoryBackend::new()));

    let lease = locker.try_acquire("pkg:1").await.unwrap();
    let err = locker.try_acquire("pkg:1").await.unwrap_err();
    assert!(matches!(err, CacheError::LockNotAcquired { ref key } if key == "pkg:1"));

    lease.release().await.unwrap();
    let again = locker.try_acquire("pkg:1").await.unwrap();
    again.release().await.unwrap();
}

#[tokio::test]
async fn leases_on_different_keys_are_independent() {
    let locker = Locker::new(Arc::new(MemoryBackend::new()));
    let _a = locker.try_acquire("a").await.unwrap();
    let _b = locker.try_acquire("b").await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn retries_pick_up_an_expiring_lease() {
    let backend = Arc::new(MemoryBackend::new());
    let short = Locker::new(backend.clone()).with_expiry(Duration::from_millis(120));
    let _stale = short.try_acquire("k").await.unwrap();

    let locker = Locker::new(backend);
    let lease = locker
        .acquire("k", Duration::from_secs(10), 5)
        .await
        .unwrap();
    assert_eq!(lease.key(), "lock:k");
    lease.release().await.unwrap();
    assert!(!locker.is_held("k").await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn rate_limiter_blocks_after_max_within_window() {
    let limiter = RateLimiter::new(Arc::new(MemoryBackend::new()));
    let limit = RateLimit {
        max: 2,
        window: Duration::from_secs(60),
    };

    assert!(limiter.allow("resend", limit).await.unwrap().allowed);
    assert!(limiter.allow("resend", limit).await.unwrap().allowed);
    let blocked = limiter.allow("resend", limit).await.unwrap();
    assert!(!blocked.allowed);
    assert!(blocked.retry_after <= Duration::from_secs(60));
    assert!(blocked.retry_after > Duration::ZERO);

    tokio::time::advance(Duration::from_secs(61)).await;
    assert!(limiter.allow("resend", limit).await.unwrap().allowed);
}
