use std::time::Duration;

use log::{debug, info};
use ppos_common::config::BLOCK_WAIT_SECONDS_PER_BLOCK;
use tokio::time::{sleep, Instant};

use crate::{error::AideError, transport::ChainTransport};

pub const DEFAULT_BLOCK_POLL_INTERVAL: Duration = Duration::from_secs(1);

// Progress is reported once every LOG_EVERY polls
const LOG_EVERY: u64 = 10;

/// Default time allowed to reach `target` from `current`
pub fn default_block_timeout(current: u64, target: u64) -> Duration {
    Duration::from_secs(
        target
            .saturating_sub(current)
            .saturating_mul(BLOCK_WAIT_SECONDS_PER_BLOCK),
    )
}

/// Wait until the chain height reaches `target`, returns the height observed
pub async fn wait_for_block(
    transport: &dyn ChainTransport,
    target: u64,
    timeout: Option<Duration>,
    poll_interval: Duration,
) -> Result<u64, AideError> {
    let mut current = transport.block_number().await?;
    if current >= target {
        return Ok(current);
    }

    let timeout = timeout.unwrap_or_else(|| default_block_timeout(current, target));
    let deadline = Instant::now() + timeout;
    if log::log_enabled!(log::Level::Debug) {
        debug!(
            "Waiting for block {} from block {} (timeout {:?})",
            target, current, timeout
        );
    }

    let mut polls: u64 = 0;
    while current < target {
        if Instant::now() >= deadline {
            return Err(AideError::BlockTimeout {
                target,
                current,
                timeout,
            });
        }

        sleep(poll_interval).await;
        current = transport.block_number().await?;

        polls += 1;
        if polls % LOG_EVERY == 0 && log::log_enabled!(log::Level::Info) {
            info!("Waiting for block {}, current block is {}", target, current);
        }
    }

    Ok(current)
}
