use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::RwLock;

/// Expected capacity and false-positive rate.
/// Tune these based on real enrollment counts.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static PIN_FILTER: Lazy<RwLock<CuckooFilter<String>>> = Lazy::new(|| {
    RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE))
});

/// PINs are matched case-insensitively everywhere.
#[inline]
fn normalize(pin: &str) -> String {
    pin.to_uppercase()
}

/// Check if a PIN might exist (false positives possible)
pub fn might_exist(pin: &str) -> bool {
    let pin = normalize(pin);
    PIN_FILTER
        .read()
        .expect("pin filter poisoned")
        .contains(&pin)
}

/// Insert a single PIN into the filter
pub fn insert(pin: &str) {
    let pin = normalize(pin);
    PIN_FILTER.write().expect("pin filter poisoned").add(&pin);
}

/// Remove a PIN from the filter
pub fn remove(pin: &str) {
    let pin = normalize(pin);
    PIN_FILTER.write().expect("pin filter poisoned").remove(&pin);
}

/// Warm up the PIN filter using streaming + batching
pub async fn warmup_pin_filter(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>("SELECT pin FROM users").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (pin,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

        batch.push(normalize(&pin));
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    log::info!("PIN filter warmup complete: {} users", total);
    Ok(())
}

/// Insert a batch of normalized PINs
fn insert_batch(pins: &[String]) {
    let mut filter = PIN_FILTER.write().expect("pin filter poisoned");

    for pin in pins {
        filter.add(pin);
    }
}
