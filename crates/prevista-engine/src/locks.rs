use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use prevista_core::Ticker;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Keyed async locks: at most one training or teardown per ticker at a time.
#[derive(Debug, Clone, Default)]
pub struct TickerLocks {
    inner: Arc<Mutex<HashMap<Ticker, Arc<AsyncMutex<()>>>>>,
}

impl TickerLocks {
    /// Wait for the ticker's lock. Different tickers never contend.
    ///
    /// # Panics
    /// Panics if the lock table mutex is poisoned.
    pub async fn lock(&self, ticker: &Ticker) -> OwnedMutexGuard<()> {
        let entry = {
            let mut table = self.inner.lock().expect("ticker lock table poisoned");
            // Drop entries nobody holds or waits on.
            table.retain(|key, lock| key == ticker || Arc::strong_count(lock) > 1);
            Arc::clone(table.entry(ticker.clone()).or_default())
        };
        entry.lock_owned().await
    }

    pub fn tracked(&self) -> usize {
        self.inner.lock().expect("ticker lock table poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ticker(symbol: &str) -> Ticker {
        Ticker::parse(symbol).expect("ticker")
    }

    #[tokio::test]
    async fn same_ticker_waits_for_the_holder() {
        let locks = TickerLocks::default();
        let guard = locks.lock(&ticker("PETR4")).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move { locks.lock(&ticker("PETR4")).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("contender acquires after release")
            .expect("task");
    }

    #[tokio::test]
    async fn different_tickers_do_not_contend() {
        let locks = TickerLocks::default();
        let _petr = locks.lock(&ticker("PETR4")).await;
        let vale = tokio::time::timeout(Duration::from_millis(100), locks.lock(&ticker("VALE3"))).await;
        assert!(vale.is_ok());
    }

    #[tokio::test]
    async fn released_entries_are_pruned() {
        let locks = TickerLocks::default();
        drop(locks.lock(&ticker("ABEV3")).await);
        drop(locks.lock(&ticker("WEGE3")).await);
        assert_eq!(locks.tracked(), 1);
    }
}
