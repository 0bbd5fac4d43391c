// src/services/geocoding/pacer.rs

use std::time::Duration;

use tokio::{
    sync::Mutex,
    time::{interval, Interval, MissedTickBehavior},
};

/// Cadência fixa entre requisições ao provedor externo.
///
/// Cada chamada a [`RequestPacer::wait`] espera o próximo tique; o primeiro é
/// imediato. Se o chamador demorar mais que o intervalo, o tique seguinte é
/// reagendado a partir de agora em vez de disparar em rajada.
pub struct RequestPacer {
    ticker: Mutex<Interval>,
    period: Duration,
}

impl RequestPacer {
    pub fn new(period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            ticker: Mutex::new(ticker),
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub async fn wait(&self) {
        self.ticker.lock().await.tick().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn spaces_out_consecutive_calls() {
        let pacer = RequestPacer::new(Duration::from_millis(1100));
        let inicio = Instant::now();
        pacer.wait().await;
        assert!(inicio.elapsed() < Duration::from_millis(1100));
        pacer.wait().await;
        pacer.wait().await;
        assert!(inicio.elapsed() >= Duration::from_millis(2200));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_is_clamped() {
        let pacer = RequestPacer::new(Duration::ZERO);
        assert_eq!(pacer.period(), Duration::from_millis(1));
        pacer.wait().await;
    }
}
