use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;

/// true  => PIN is TAKEN
/// false => PIN is AVAILABLE (usually we store only taken)
pub static PIN_CACHE: Lazy<Cache<String, bool>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(500_000) // tune based on memory
        .time_to_live(Duration::from_secs(86400)) // 24h TTL
        .build()
});

/// Mark a single PIN as taken
pub async fn mark_taken(pin: &str) {
    PIN_CACHE.insert(pin.to_uppercase(), true).await;
}

/// Check if a PIN is taken
pub async fn is_taken(pin: &str) -> bool {
    PIN_CACHE.get(&pin.to_uppercase()).await.unwrap_or(false)
}

/// Batch mark PINs as taken
async fn batch_mark(pins: &[String]) {
    let futures: Vec<_> = pins
        .iter()
        .map(|p| PIN_CACHE.insert(p.to_uppercase(), true))
        .collect();

    // Await all insertions concurrently
    futures::future::join_all(futures).await;
}

/// Load only RECENTLY ACTIVE PINs into the in-memory cache (batched)
pub async fn warmup_pin_cache(pool: &MySqlPool, days: u32, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>(
        r#"
        SELECT pin
        FROM users
        WHERE last_login_at >= NOW() - INTERVAL ? DAY
        ORDER BY last_login_at DESC
        "#,
    )
    .bind(days)
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total_count = 0usize;

    while let Some(row) = stream.next().await {
        let (pin,) = row?;
        batch.push(pin);
        total_count += 1;

        if batch.len() >= batch_size {
            batch_mark(&batch).await;
            batch.clear();
        }
    }

    // Insert any remaining PINs
    if !batch.is_empty() {
        batch_mark(&batch).await;
    }

    log::info!(
        "PIN cache warmup complete: {} recent users (last {} days)",
        total_count,
        days
    );

    Ok(())
}
