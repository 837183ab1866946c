use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures_util::StreamExt;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// Expected capacity and false-positive rate.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static QR_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

/// Set once every stored token has been loaded.
static WARM: AtomicBool = AtomicBool::new(false);

pub fn new_qr_token() -> String {
    format!("EMP{}", Uuid::new_v4().to_simple())
}

pub fn is_warm() -> bool {
    WARM.load(Ordering::Acquire)
}

/// False positives possible. A poisoned lock answers "maybe".
pub fn might_exist(token: &str) -> bool {
    QR_FILTER
        .read()
        .map(|f| f.contains(&token.to_owned()))
        .unwrap_or(true)
}

pub fn insert(token: &str) {
    if let Ok(mut f) = QR_FILTER.write() {
        f.add(&token.to_owned());
    }
}

pub fn remove(token: &str) {
    if let Ok(mut f) = QR_FILTER.write() {
        f.remove(&token.to_owned());
    }
}

async fn stored(pool: &MySqlPool, token: &str) -> Result<bool, sqlx::Error> {
    let hits: i64 =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM employees WHERE qr_code = ? LIMIT 1)")
            .bind(token)
            .fetch_one(pool)
            .await?;
    Ok(hits != 0)
}

/// Draws tokens until one is known to be unused. Once the filter is warm a definite
/// miss is enough; otherwise the employees table decides.
pub async fn generate_unique_qr_code(pool: &MySqlPool) -> Result<String, sqlx::Error> {
    loop {
        let token = new_qr_token();

        if is_warm() && !might_exist(&token) {
            return Ok(token);
        }

        if !stored(pool, &token).await? {
            return Ok(token);
        }

        tracing::debug!(token, "QR token collision, retrying");
    }
}

/// Loads every stored QR token, streaming in batches.
pub async fn warmup_qr_filter(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>("SELECT qr_code FROM employees").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (token,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

        batch.push(token);
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    WARM.store(true, Ordering::Release);
    log::info!("QR filter warmup complete: {} employees", total);
    Ok(())
}

fn insert_batch(tokens: &[String]) {
    if let Ok(mut filter) = QR_FILTER.write() {
        for token in tokens {
            filter.add(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_prefixed_and_distinct() {
        let a = new_qr_token();
        let b = new_qr_token();
        assert!(a.starts_with("EMP"));
        assert_eq!(a.len(), 35);
        assert_ne!(a, b);
    }

    #[test]
    fn inserted_tokens_are_reported() {
        let token = new_qr_token();
        insert(&token);
        assert!(might_exist(&token));
        remove(&token);
    }
}
