//! Epoch lifecycle
//!
//! Epochs are created back to back: each new epoch starts where the previous
//! one ended and lasts one phase. The oracle registry is copied into the epoch
//! at creation and never changes afterwards.

use crate::registry;
use drops_core::{
    DropsConfig, DropsError, DropsState, EpochRecord, GlobalState, Notification, Outbox,
    PhysicalTime, Result,
};
use tracing::{debug, info};

/// Create the global row and epoch 1.
///
/// Epoch 1 starts at `now` rounded down to a whole phase so that epoch
/// boundaries line up with the phase grid. The system starts disabled.
pub fn initialize(
    state: &mut DropsState,
    config: &DropsConfig,
    now: PhysicalTime,
) -> Result<EpochRecord> {
    if state.global.is_some() {
        return Err(DropsError::AlreadyInitialized);
    }
    let oracles = registry::snapshot(state)?;

    let start = now.floor_to(config.epoch_phase());
    let record = EpochRecord {
        epoch: 1,
        start,
        end: start + config.epoch_phase(),
        oracles,
        completed: false,
    };
    state.epochs.insert(1, record.clone());
    state.global = Some(GlobalState {
        epoch: 1,
        enabled: false,
    });

    info!(start = %record.start, end = %record.end, "Initialized at epoch 1");
    Ok(record)
}

/// Advance exactly one epoch.
///
/// Requires the system to be enabled, the active epoch to have ended and at
/// least one registered oracle. Every subscriber receives an
/// [`Notification::EpochAdvanced`].
pub fn advance(
    state: &mut DropsState,
    config: &DropsConfig,
    now: PhysicalTime,
    outbox: &mut Outbox,
) -> Result<EpochRecord> {
    state.ensure_enabled()?;

    let current = state.current_epoch()?;
    let previous_end = state.epoch(current)?.end;
    if now < previous_end {
        return Err(DropsError::EpochNotEnded {
            epoch: current,
            end: previous_end,
        });
    }
    let oracles = registry::snapshot(state)?;

    let next = current + 1;
    let record = EpochRecord {
        epoch: next,
        start: previous_end,
        end: previous_end + config.epoch_phase(),
        oracles,
        completed: false,
    };
    state.epochs.insert(next, record.clone());
    state.global_mut()?.epoch = next;

    for subscriber in &state.subscribers {
        outbox.push(Notification::EpochAdvanced {
            subscriber: subscriber.clone(),
            epoch: next,
        });
    }

    info!(
        epoch = next,
        start = %record.start,
        end = %record.end,
        oracles = record.oracles.len(),
        "Epoch advanced"
    );
    Ok(record)
}

/// Advance repeatedly until the active epoch ends in the future.
pub fn advance_to_present(
    state: &mut DropsState,
    config: &DropsConfig,
    now: PhysicalTime,
    outbox: &mut Outbox,
) -> Result<EpochRecord> {
    let mut record = advance(state, config, now, outbox)?;
    while now >= record.end {
        debug!(epoch = record.epoch, "Catching up missed epoch");
        record = advance(state, config, now, outbox)?;
    }
    Ok(record)
}
