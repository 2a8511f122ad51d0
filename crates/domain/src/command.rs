//! Commands sent to node actuators.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An actuator command, published as its plain-text name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCommand {
    /// Start the local siren/buzzer.
    ActuateAlarm,
    /// Silence it.
    StopAlarm,
}

impl NodeCommand {
    /// Wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ActuateAlarm => "actuate_alarm",
            Self::StopAlarm => "stop_alarm",
        }
    }
}

impl fmt::Display for NodeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
