//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every target
//! - Update target health flags based on results
//! - Report the healthy target count

use futures_util::future::join_all;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::load_balancer::Pool;
use crate::observability::metrics;

pub struct HealthMonitor {
    pool: Arc<Pool>,
    config: HealthCheckConfig,
}

impl HealthMonitor {
    pub fn new(pool: Arc<Pool>, config: HealthCheckConfig) -> Self {
        Self { pool, config }
    }

    /// Run health cycles until a shutdown signal arrives.
    ///
    /// The first cycle starts immediately.
    pub async fn run(self, shutdown: broadcast::Receiver<()>) {
        self.run_from(Instant::now(), shutdown).await
    }

    /// Like [`run`](Self::run), for callers that already awaited one
    /// [`check_all`](Self::check_all): the next cycle starts one cadence from now.
    pub async fn run_after_first_cycle(self, shutdown: broadcast::Receiver<()>) {
        let start = Instant::now() + self.config.cadence();
        self.run_from(start, shutdown).await
    }

    async fn run_from(self, start: Instant, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            cadence_secs = self.config.cadence_seconds,
            timeout_secs = self.config.timeout_seconds,
            targets = self.pool.len(),
            "Health monitor starting"
        );

        let mut ticker = time::interval_at(start, self.config.cadence());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every target concurrently and return the healthy count.
    ///
    /// Each probe has its own timeout, so a hanging target does not delay the
    /// verdict on the others.
    pub async fn check_all(&self) -> usize {
        let timeout = self.config.timeout();
        let results = join_all(
            self.pool
                .targets()
                .iter()
                .map(|target| target.probe(timeout)),
        )
        .await;

        let healthy = results.into_iter().filter(|healthy| *healthy).count();
        metrics::set_healthy_targets(healthy);

        tracing::debug!(
            healthy,
            total = self.pool.len(),
            "Health check cycle complete"
        );
        if healthy == 0 {
            tracing::warn!(total = self.pool.len(), "No healthy targets in pool");
        }
        healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn config(timeout_seconds: u64) -> HealthCheckConfig {
        HealthCheckConfig {
            cadence_seconds: 1,
            timeout_seconds,
        }
    }

    async fn closed_port() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        addr.to_string()
    }

    #[tokio::test]
    async fn check_all_flags_each_target() {
        let up = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let up_addr = up.local_addr().unwrap().to_string();
        let down_addr = closed_port().await;

        let pool = Arc::new(Pool::from_addresses(&[up_addr, down_addr]).unwrap());
        let monitor = HealthMonitor::new(pool.clone(), config(1));

        assert_eq!(monitor.check_all().await, 1);
        assert!(pool.targets()[0].is_healthy());
        assert!(!pool.targets()[1].is_healthy());
    }

    #[tokio::test]
    async fn repeated_cycles_are_idempotent() {
        let up = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let up_addr = up.local_addr().unwrap().to_string();
        let down_addr = closed_port().await;

        let pool = Arc::new(Pool::from_addresses(&[down_addr, up_addr]).unwrap());
        let monitor = HealthMonitor::new(pool.clone(), config(1));

        monitor.check_all().await;
        let first: Vec<bool> = pool.targets().iter().map(|t| t.is_healthy()).collect();
        monitor.check_all().await;
        let second: Vec<bool> = pool.targets().iter().map(|t| t.is_healthy()).collect();

        assert_eq!(first, vec![false, true]);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn slow_target_does_not_delay_others() {
        let up = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let up_addr = up.local_addr().unwrap().to_string();

        // Several non-routable targets; run sequentially they would take a
        // multiple of the timeout.
        let addresses = vec![
            "192.0.2.1:81".to_string(),
            "192.0.2.2:81".to_string(),
            "192.0.2.3:81".to_string(),
            up_addr,
        ];
        let pool = Arc::new(Pool::from_addresses(&addresses).unwrap());
        let monitor = HealthMonitor::new(pool.clone(), config(1));

        let start = Instant::now();
        assert_eq!(monitor.check_all().await, 1);
        assert!(start.elapsed() < Duration::from_millis(2_500));
        assert!(pool.targets()[3].is_healthy());
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let up = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = up.local_addr().unwrap().to_string();
        let pool = Arc::new(Pool::from_addresses(&[address]).unwrap());
        let monitor = HealthMonitor::new(pool.clone(), config(1));

        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(monitor.run(rx));

        // The first tick is immediate.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(pool.targets()[0].is_healthy());

        tx.send(()).unwrap();
        time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("monitor did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn run_after_first_cycle_waits_one_cadence() {
        let up = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = up.local_addr().unwrap().to_string();
        let pool = Arc::new(Pool::from_addresses(&[address]).unwrap());
        let monitor = HealthMonitor::new(pool.clone(), config(1));

        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(monitor.run_after_first_cycle(rx));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!pool.targets()[0].is_healthy());

        tokio::time::sleep(Duration::from_millis(1_200)).await;
        assert!(pool.targets()[0].is_healthy());

        tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
