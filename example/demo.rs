use singleflight_cache::{CacheError, KeyedFetchCache};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const LOAD_DELAY_MS: u64 = 100;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A producer answering `"{name} 0"`, `"{name} 1"`, ... after a short delay.
fn counter(name: &'static str) -> impl Fn((), String) -> BoxFuture<Result<String, String>> {
    let count = Arc::new(AtomicUsize::new(0));
    move |_: (), _: String| -> BoxFuture<Result<String, String>> {
        let count = count.clone();
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(LOAD_DELAY_MS)).await;
            Ok::<_, String>(format!("{name} {}", count.fetch_add(1, Ordering::SeqCst)))
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), CacheError<String>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("singleflight_cache=debug")),
        )
        .init();

    println!("Tagged debug output, one second expiry:");
    let cache1 = KeyedFetchCache::builder(counter("cache1"))
        .single_slot()
        .debug("count1")
        .expire(Duration::from_secs(1))
        .build();
    println!("Got: {}", cache1.fetch(()).await?);
    tokio::time::sleep(Duration::from_millis(500)).await;
    println!("Got: {}", cache1.fetch(()).await?);
    tokio::time::sleep(Duration::from_millis(700)).await;
    println!("Got: {}", cache1.fetch(()).await?);

    println!("Three concurrent callers share one fetch:");
    let cache3 = KeyedFetchCache::builder(counter("cache3"))
        .single_slot()
        .debug(true)
        .expire(Duration::from_millis(100))
        .build();
    let (a, b, c) = tokio::join!(cache3.fetch(()), cache3.fetch(()), cache3.fetch(()));
    println!("Got: {}, {}, {}", a?, b?, c?);
    tokio::time::sleep(Duration::from_millis(500)).await;
    println!("Got: {}", cache3.fetch(()).await?);

    println!("Failures reach every waiter and are not cached:");
    let cache4 = KeyedFetchCache::builder(|_: (), _: String| async {
        Err::<String, _>("cache4 error".to_string())
    })
    .single_slot()
    .build();
    let (first, second) = tokio::join!(cache4.fetch(()), cache4.fetch(()));
    for result in [first, second] {
        if let Err(err) = result {
            println!("Error: {err}");
        }
    }

    println!("Keyed queries:");
    let users = KeyedFetchCache::builder(|id: u32, key: String| async move {
        tokio::time::sleep(Duration::from_millis(LOAD_DELAY_MS)).await;
        Ok::<_, String>(format!("user {id} (key {key})"))
    })
    .debug("users")
    .build();
    println!("Got: {}", users.fetch(1).await?);
    println!("Got: {}", users.fetch(2).await?);
    println!("Flushed: {}", users.flush(&1).await?);
    println!("Got: {}", users.fetch(1).await?);

    Ok(())
}
