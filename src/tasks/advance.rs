use std::time::Duration;

use anyhow::Result;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace};

use crate::state::Slideshow;

/// Advance the slideshow once per `period` until cancelled.
///
/// The first advance happens one full period after start so the initial
/// image gets its full dwell time.
#[instrument(skip(slideshow, cancel), fields(period_ms = whole_millis(period)))]
pub async fn run(slideshow: Slideshow, period: Duration, cancel: CancellationToken) -> Result<()> {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting advance task");
                break;
            }
            _ = ticker.tick() => match slideshow.advance() {
                Some(path) => debug!(path = %path.display(), "advanced"),
                None => trace!("no images; nothing to advance"),
            }
        }
    }
    Ok(())
}

fn whole_millis(period: Duration) -> u64 {
    u64::try_from(period.as_millis()).unwrap_or(u64::MAX)
}
