//! Live channel helpers shared by the controllers.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::warn;

use fleetsync_protocols::channel::ChannelState;

/// Shortest refresh or report period a controller will run with.
pub(crate) const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Next live channel state, or never if there is no channel.
pub(crate) async fn next_state(rx: &mut Option<watch::Receiver<ChannelState>>) -> ChannelState {
    let Some(inner) = rx.as_mut() else {
        return std::future::pending().await;
    };
    if inner.changed().await.is_ok() {
        return *inner.borrow_and_update();
    }
    *rx = None;
    ChannelState::Closed
}

/// Periodic ticker whose first tick is one period from now. Missed ticks
/// are delayed, not bursted.
pub(crate) fn ticker(period: Duration) -> Interval {
    let period = if period < MIN_PERIOD {
        warn!(
            requested_ms = period.as_millis() as u64,
            min_ms = MIN_PERIOD.as_millis() as u64,
            "Period too short, clamping"
        );
        MIN_PERIOD
    } else {
        period
    };
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ticker_first_tick_after_one_period() {
        let start = Instant::now();
        let mut ticker = ticker(Duration::from_secs(5));
        ticker.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_clamps_zero_period() {
        let start = Instant::now();
        let mut ticker = ticker(Duration::ZERO);
        ticker.tick().await;
        ticker.tick().await;
        assert_eq!(start.elapsed(), MIN_PERIOD * 2);
    }

    #[tokio::test]
    async fn test_next_state_without_channel_stays_pending() {
        let mut rx = None;
        let result = tokio::time::timeout(Duration::from_millis(10), next_state(&mut rx)).await;
        assert!(result.is_err());
    }
}
