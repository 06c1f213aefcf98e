//! Periodic "current time" field updates.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::state::ObservableState;

pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(10);

/// Short clock format, e.g. "9:41 AM".
pub fn short_time<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.format("%-I:%M %p").to_string()
}

/// Writes the local time into the state's `time` field on a fixed schedule.
///
/// Stopped by `stop()` or on drop; after that the field is never written again.
pub struct ClockTicker {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ClockTicker {
    /// Spawn the ticker on the current tokio runtime.
    pub fn start(state: Arc<ObservableState>, initial_delay: Duration, period: Duration) -> Self {
        let period = if period.is_zero() {
            tracing::warn!("Clock period of zero replaced with {:?}", DEFAULT_PERIOD);
            DEFAULT_PERIOD
        } else {
            period
        };

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + initial_delay, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if token.is_cancelled() || state.is_disposed() {
                            break;
                        }
                        state.set_time(Some(short_time(&Local::now())));
                    }
                }
            }
            tracing::debug!("Clock ticker stopped");
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    pub fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ClockTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_short_time_format() {
        let time = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(21, 5, 0)
            .unwrap()
            .and_utc();
        assert_eq!(short_time(&time), "9:05 PM");
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_initial_delay() {
        let state = Arc::new(ObservableState::default());
        let _ticker = ClockTicker::start(
            state.clone(),
            Duration::from_millis(100),
            Duration::from_secs(10),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(state.current().time.is_none());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(state.current().time.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_updates_after_stop() {
        let state = Arc::new(ObservableState::default());
        let mut ticker = ClockTicker::start(
            state.clone(),
            Duration::from_millis(100),
            Duration::from_secs(10),
        );

        tokio::time::sleep(Duration::from_millis(200)).await;
        ticker.stop();
        assert!(!ticker.is_running());

        state.set_time(None);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(state.current().time.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_ticker() {
        let state = Arc::new(ObservableState::default());
        let ticker = ClockTicker::start(
            state.clone(),
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        drop(ticker);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(state.current().time.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disposed_state_stops_ticker() {
        let state = Arc::new(ObservableState::default());
        let ticker = ClockTicker::start(
            state.clone(),
            Duration::from_millis(10),
            Duration::from_secs(1),
        );
        state.dispose();

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(state.current().time.is_none());
        assert!(!ticker.is_running());
    }
}
