//! Threshold evaluation of a node's latest readings against its zone.

use crate::alarm::TriggerCause;
use crate::node::Readings;
use crate::zone::Thresholds;

/// Decide whether `readings` exceed `thresholds`.
///
/// Flame wins over temperature, which wins over smoke. Comparisons are strict
/// and a reading that was never reported never triggers.
#[must_use]
pub fn evaluate(readings: &Readings, thresholds: &Thresholds) -> Option<TriggerCause> {
    if readings.flame_detected == Some(true) {
        return Some(TriggerCause::Flame);
    }
    if readings
        .temperature
        .is_some_and(|value| value > thresholds.temperature)
    {
        return Some(TriggerCause::Temperature);
    }
    if readings
        .smoke_level
        .is_some_and(|value| value > thresholds.smoke)
    {
        return Some(TriggerCause::Smoke);
    }
    None
}
