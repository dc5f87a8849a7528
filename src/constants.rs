//! Calendar and protocol constants shared across the model.
//! Epoch counts follow the hub checkpoint calendar (6.4 minute epochs, ~225 per day).

/// Number of epochs in one day.
pub const EPOCHS_PER_DAY: f64 = 225.0;

/// Number of epochs in one month.
pub const EPOCHS_PER_MONTH: f64 = 6_750.0;

/// Number of epochs in one year.
pub const EPOCHS_PER_YEAR: f64 = 82_180.0;

/// Gas cost of a single chain-to-hub checkpoint submission.
pub const CHECKPOINT_GAS_COST: f64 = 210_000.0;

/// Minimum stake exposure on a chain. Entries below this are floored to zero
/// after every stake matrix mutation.
pub const MIN_EXPOSURE: f64 = 180_000.0;

/// Gwei per unit of the settlement token, used for checkpoint gas pricing.
pub const GWEI: f64 = 1e9;

/// Seconds in one day, used to scale per-second transaction rates to epochs.
pub const SECONDS_PER_DAY: f64 = 86_400.0;
