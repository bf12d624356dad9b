//! Integration tests for the key cache
//!
//! Covers expiry under simulated time, overwrite semantics, refresh-on-miss,
//! failure handling and single-flight behaviour under concurrent misses.

use secure_key_cache::{
    CacheConfig, CacheError, FetchError, FetchedKey, KeyCache, ManualClock, SecretValue,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

fn cache_with_clock() -> (KeyCache, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let cache = KeyCache::with_clock(CacheConfig::default(), clock.clone());
    (cache, clock)
}

const SERVICES: [&str; 4] = ["stripe", "maps", "analytics", "search"];

#[test]
fn test_put_then_get_for_every_service() {
    let (cache, _clock) = cache_with_clock();
    for (i, service) in SERVICES.iter().enumerate() {
        let value = format!("key-{service}");
        cache.put(service, value.clone(), Some(Duration::from_secs(10 + i as u64)));
        assert_eq!(cache.get(service).unwrap().expose_secret(), value);
    }
}

#[test]
fn test_every_entry_expires_after_its_ttl() {
    let (cache, clock) = cache_with_clock();
    for (i, service) in SERVICES.iter().enumerate() {
        cache.put(service, "v", Some(Duration::from_secs(100 * (i as u64 + 1))));
    }

    clock.advance(Duration::from_secs(101));
    assert!(cache.get("stripe").is_none());
    assert!(cache.get("maps").is_some());

    clock.advance(Duration::from_secs(300));
    for service in SERVICES {
        assert!(cache.get(service).is_none(), "{service} should have expired");
    }
    assert!(cache.is_empty());
}

#[test]
fn test_stripe_key_expires_after_clock_advance() {
    let (cache, clock) = cache_with_clock();
    cache.put("stripe", "sk_live_abc", Some(Duration::from_secs(1000)));
    assert_eq!(cache.get("stripe").unwrap().expose_secret(), "sk_live_abc");

    clock.advance(Duration::from_secs(1001));
    assert_eq!(cache.get("stripe"), None);
}

#[test]
fn test_second_put_replaces_value() {
    let (cache, _clock) = cache_with_clock();
    cache.put("maps", "first", Some(Duration::from_secs(60)));
    cache.put("maps", "second", Some(Duration::from_secs(60)));
    assert_eq!(cache.get("maps"), Some(SecretValue::from("second")));
}

#[tokio::test]
async fn test_maps_key_fetched_then_served_from_cache() {
    let (cache, _clock) = cache_with_clock();

    let value = cache
        .get_or_fetch("maps", |service_id| async move {
            assert_eq!(service_id, "maps");
            Ok(FetchedKey::new("AIza...", Some(Duration::from_secs(500))))
        })
        .await
        .unwrap();

    assert_eq!(value.expose_secret(), "AIza...");
    assert_eq!(cache.get("maps").unwrap().expose_secret(), "AIza...");
}

#[tokio::test]
async fn test_get_or_fetch_within_ttl_does_not_refetch() {
    let (cache, clock) = cache_with_clock();
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..5 {
        let calls = calls.clone();
        cache
            .get_or_fetch("maps", move |_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(FetchedKey::new("AIza...", Some(Duration::from_secs(500))))
            })
            .await
            .unwrap();
        clock.advance(Duration::from_secs(90));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_fetch_is_surfaced_and_nothing_written() {
    let (cache, _clock) = cache_with_clock();
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..2 {
        let calls = calls.clone();
        let result = cache
            .get_or_fetch("stripe", move |_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(FetchError::Unauthorized { status: 401 })
            })
            .await;

        assert_eq!(
            result,
            Err(CacheError::FetchFailed {
                service_id: "stripe".to_string(),
                source: FetchError::Unauthorized { status: 401 },
            })
        );
        assert!(cache.get("stripe").is_none());
    }

    // Each call on a failed cache invokes the fetch exactly once
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_concurrent_misses_share_one_fetch() {
    let (cache, _clock) = cache_with_clock();
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Notify::new());

    let callers = (0..8).map(|_| {
        let cache = cache.clone();
        let calls = calls.clone();
        let gate = gate.clone();
        async move {
            cache
                .get_or_fetch("maps", move |_| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    gate.notified().await;
                    Ok(FetchedKey::new("AIza-shared", Some(Duration::from_secs(500))))
                })
                .await
        }
    });
    let release = async {
        tokio::task::yield_now().await;
        gate.notify_one();
    };

    let (results, ()) = futures::join!(futures::future::join_all(callers), release);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for result in results {
        assert_eq!(result.unwrap().expose_secret(), "AIza-shared");
    }
}

#[tokio::test]
async fn test_concurrent_misses_share_one_failure() {
    let (cache, _clock) = cache_with_clock();
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Notify::new());

    let callers = (0..4).map(|_| {
        let cache = cache.clone();
        let calls = calls.clone();
        let gate = gate.clone();
        async move {
            cache
                .get_or_fetch("stripe", move |_| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    gate.notified().await;
                    Err(FetchError::Transport("connection refused".to_string()))
                })
                .await
        }
    });
    let release = async {
        tokio::task::yield_now().await;
        gate.notify_one();
    };

    let (results, ()) = futures::join!(futures::future::join_all(callers), release);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for result in results {
        let err = result.unwrap_err();
        assert_eq!(err.fetch_error().as_str(), "transport");
    }
    assert!(cache.is_empty());

    // The failed flight is gone; the next miss fetches again
    let retried = cache
        .get_or_fetch("stripe", |_| async {
            Ok(FetchedKey::new("sk_live_abc", None))
        })
        .await
        .unwrap();
    assert_eq!(retried.expose_secret(), "sk_live_abc");
}

#[tokio::test]
async fn test_different_services_fetch_independently() {
    let (cache, _clock) = cache_with_clock();
    let calls = Arc::new(AtomicUsize::new(0));

    let fetches = SERVICES.iter().map(|service| {
        let cache = cache.clone();
        let calls = calls.clone();
        async move {
            cache
                .get_or_fetch(service, move |id| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(FetchedKey::new(format!("key-{id}"), None))
                })
                .await
        }
    });
    let results = futures::future::join_all(fetches).await;

    assert_eq!(calls.load(Ordering::SeqCst), SERVICES.len());
    for (service, result) in SERVICES.iter().zip(results) {
        assert_eq!(result.unwrap().expose_secret(), format!("key-{service}"));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_spawned_misses_across_threads_fetch_once() {
    let cache = KeyCache::new(CacheConfig::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Notify::new());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let cache = cache.clone();
            let calls = calls.clone();
            let gate = gate.clone();
            tokio::spawn(async move {
                cache
                    .get_or_fetch("analytics", move |_| async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        gate.notified().await;
                        Ok(FetchedKey::new("UA-1", None))
                    })
                    .await
            })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(100)).await;
    gate.notify_one();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().expose_secret(), "UA-1");
    }
    // Late callers see a hit; none starts a second fetch
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_abandoned_fetch_times_out_and_next_miss_fetches_again() {
    let config = CacheConfig::default().with_fetch_timeout(Duration::from_millis(50));
    let cache = KeyCache::new(config);
    let second_calls = Arc::new(AtomicUsize::new(0));

    let first = cache.get_or_fetch("maps", |_| async {
        std::future::pending::<Result<FetchedKey, FetchError>>().await
    });
    // The caller gives up long before the fetch timeout
    assert!(tokio::time::timeout(Duration::from_millis(10), first)
        .await
        .is_err());

    // The fetch keeps running without a waiter, times out and deregisters
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(cache.get("maps").is_none());

    let value = {
        let second_calls = second_calls.clone();
        cache
            .get_or_fetch("maps", move |_| async move {
                second_calls.fetch_add(1, Ordering::SeqCst);
                Ok(FetchedKey::new("from-second", None))
            })
            .await
            .unwrap()
    };

    assert_eq!(value.expose_secret(), "from-second");
    assert_eq!(second_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_abandoned_fetch_completes_and_populates_cache() {
    let cache = KeyCache::new(CacheConfig::default());
    let gate = Arc::new(Notify::new());
    let later_calls = Arc::new(AtomicUsize::new(0));

    let first = {
        let gate = gate.clone();
        cache.get_or_fetch("maps", move |_| async move {
            gate.notified().await;
            Ok(FetchedKey::new("from-first", Some(Duration::from_secs(500))))
        })
    };
    assert!(tokio::time::timeout(Duration::from_millis(20), first)
        .await
        .is_err());

    gate.notify_one();
    for _ in 0..100 {
        if cache.get("maps").is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(cache.get("maps").unwrap().expose_secret(), "from-first");

    let value = {
        let later_calls = later_calls.clone();
        cache
            .get_or_fetch("maps", move |_| async move {
                later_calls.fetch_add(1, Ordering::SeqCst);
                Ok(FetchedKey::new("from-later", None))
            })
            .await
            .unwrap()
    };
    assert_eq!(value.expose_secret(), "from-first");
    assert_eq!(later_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_panicking_fetch_is_cancelled_and_deregistered() {
    let cache = KeyCache::new(CacheConfig::default());

    let err = cache
        .get_or_fetch("maps", |service_id| async move {
            assert!(service_id.is_empty(), "fetch for {service_id} blew up");
            Ok(FetchedKey::new("unreachable", None))
        })
        .await
        .unwrap_err();
    assert_eq!(err.fetch_error(), &FetchError::Cancelled);
    assert!(cache.get("maps").is_none());

    let value = cache
        .get_or_fetch("maps", |_| async { Ok(FetchedKey::new("recovered", None)) })
        .await
        .unwrap();
    assert_eq!(value.expose_secret(), "recovered");
}

#[test]
fn test_interleaved_puts_and_gets_across_threads() {
    let cache = KeyCache::new(CacheConfig::default());

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let cache = cache.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    cache.put("shared", format!("{t}-{i}"), Some(Duration::from_secs(60)));
                    let _ = cache.get("shared");
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    let last = cache.get("shared").unwrap();
    assert!(last.expose_secret().ends_with("-199"));
    assert_eq!(cache.len(), 1);
}
