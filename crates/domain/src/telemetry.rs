//! Telemetry topic routing.
//!
//! Devices publish under `devices/<address>/<category>[/<kind>]`:
//!
//! | Topic | Payload |
//! |-------|---------|
//! | `devices/<addr>/discovery` | `online` |
//! | `devices/<addr>/sensor/temp` | decimal degrees, e.g. `25.50` |
//! | `devices/<addr>/sensor/smoke` | decimal level, e.g. `300` |
//! | `devices/<addr>/sensor/flame` | `0` = flame detected, `1` = clear |
//!
//! [`route`] turns one inbound message into a [`RoutedMessage`]. It never fails:
//! anything it cannot use is either [`Ignored`](RoutedMessage::Ignored) or
//! [`Rejected`](RoutedMessage::Rejected) with a reason for the log.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::address::DeviceAddress;

/// First topic segment of every device topic.
pub const TOPIC_ROOT: &str = "devices";
/// Subscription filter for discovery announcements.
pub const DISCOVERY_FILTER: &str = "devices/+/discovery";
/// Subscription filter for sensor readings.
pub const SENSOR_FILTER: &str = "devices/+/sensor/+";

const DISCOVERY: &str = "discovery";
const SENSOR: &str = "sensor";
const ONLINE: &str = "online";

/// Kind of sensor carried in the last topic segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Temp,
    Smoke,
    Flame,
}

impl SensorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Temp => "temp",
            Self::Smoke => "smoke",
            Self::Flame => "flame",
        }
    }

    /// Parse a payload for this kind of sensor.
    fn parse_value(self, payload: &str) -> Result<SensorReading, RejectReason> {
        let value = payload.trim();
        let invalid = || RejectReason::InvalidValue {
            kind: self,
            value: value.to_string(),
        };
        match self {
            Self::Temp | Self::Smoke => {
                let number = f64::from_str(value).map_err(|_| invalid())?;
                if !number.is_finite() {
                    return Err(invalid());
                }
                Ok(if self == Self::Temp {
                    SensorReading::Temperature(number)
                } else {
                    SensorReading::Smoke(number)
                })
            }
            Self::Flame => match value {
                "0" => Ok(SensorReading::Flame(true)),
                "1" => Ok(SensorReading::Flame(false)),
                _ => Err(invalid()),
            },
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorKind {
    type Err = RejectReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "temp" => Ok(Self::Temp),
            "smoke" => Ok(Self::Smoke),
            "flame" => Ok(Self::Flame),
            other => Err(RejectReason::UnknownSensorKind(other.to_string())),
        }
    }
}

/// A typed sensor value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SensorReading {
    Temperature(f64),
    Smoke(f64),
    /// `true` when a flame is detected.
    Flame(bool),
}

/// A device announced it is online.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryEvent {
    pub address: DeviceAddress,
}

/// A device reported a sensor value.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorEvent {
    pub address: DeviceAddress,
    pub reading: SensorReading,
}

/// Why a message was rejected. Logged, never propagated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("malformed topic {0:?}")]
    MalformedTopic(String),

    #[error("invalid device address in topic {0:?}")]
    InvalidAddress(String),

    #[error("sensor topic {0:?} has no sensor kind")]
    MissingSensorKind(String),

    #[error("unknown sensor kind {0:?}")]
    UnknownSensorKind(String),

    #[error("payload is not valid UTF-8")]
    NonUtf8Payload,

    #[error("invalid {kind} value {value:?}")]
    InvalidValue { kind: SensorKind, value: String },
}

/// Outcome of routing one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutedMessage {
    Discovery(DiscoveryEvent),
    Sensor(SensorEvent),
    /// Well-formed but irrelevant (non-`online` discovery payload, foreign category).
    Ignored,
    Rejected(RejectReason),
}

/// Route one inbound transport message.
#[must_use]
pub fn route(topic: &str, payload: &[u8]) -> RoutedMessage {
    match try_route(topic, payload) {
        Ok(Some(message)) => message,
        Ok(None) => RoutedMessage::Ignored,
        Err(reason) => RoutedMessage::Rejected(reason),
    }
}

fn try_route(topic: &str, payload: &[u8]) -> Result<Option<RoutedMessage>, RejectReason> {
    let parts: Vec<&str> = topic.split('/').collect();
    if parts.len() < 3 || parts[0] != TOPIC_ROOT {
        return Err(RejectReason::MalformedTopic(topic.to_string()));
    }

    let address =
        DeviceAddress::parse(parts[1]).map_err(|_| RejectReason::InvalidAddress(topic.to_string()))?;

    match parts[2] {
        DISCOVERY => {
            let text = decode(payload)?;
            if text == ONLINE {
                Ok(Some(RoutedMessage::Discovery(DiscoveryEvent { address })))
            } else {
                Ok(None)
            }
        }
        SENSOR => {
            let kind: SensorKind = parts
                .get(3)
                .ok_or_else(|| RejectReason::MissingSensorKind(topic.to_string()))?
                .parse()?;
            let reading = kind.parse_value(decode(payload)?)?;
            Ok(Some(RoutedMessage::Sensor(SensorEvent { address, reading })))
        }
        _ => Ok(None),
    }
}

fn decode(payload: &[u8]) -> Result<&str, RejectReason> {
    std::str::from_utf8(payload).map_err(|_| RejectReason::NonUtf8Payload)
}

/// Topic on which commands for `address` are published.
#[must_use]
pub fn command_topic(address: &DeviceAddress) -> String {
    format!("{TOPIC_ROOT}/{address}/command")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "AA:BB:CC:DD:EE:01";

    fn addr() -> DeviceAddress {
        DeviceAddress::parse(ADDR).unwrap()
    }

    #[test]
    fn should_route_online_discovery() {
        let msg = route(&format!("devices/{ADDR}/discovery"), b"online");
        assert_eq!(
            msg,
            RoutedMessage::Discovery(DiscoveryEvent { address: addr() })
        );
    }

    #[test]
    fn should_ignore_discovery_with_other_payload() {
        let msg = route(&format!("devices/{ADDR}/discovery"), b"offline");
        assert_eq!(msg, RoutedMessage::Ignored);
    }

    #[test]
    fn should_ignore_discovery_when_payload_is_not_exactly_online() {
        let padded = route(&format!("devices/{ADDR}/discovery"), b" online\n");
        let shouting = route(&format!("devices/{ADDR}/discovery"), b"ONLINE");
        assert_eq!(padded, RoutedMessage::Ignored);
        assert_eq!(shouting, RoutedMessage::Ignored);
    }

    #[test]
    fn should_route_temperature_reading() {
        let msg = route(&format!("devices/{ADDR}/sensor/temp"), b"55.0");
        assert_eq!(
            msg,
            RoutedMessage::Sensor(SensorEvent {
                address: addr(),
                reading: SensorReading::Temperature(55.0),
            })
        );
    }

    #[test]
    fn should_route_smoke_reading_with_whitespace() {
        let msg = route(&format!("devices/{ADDR}/sensor/smoke"), b" 300\n");
        assert!(matches!(
            msg,
            RoutedMessage::Sensor(SensorEvent {
                reading: SensorReading::Smoke(v),
                ..
            }) if (v - 300.0).abs() < f64::EPSILON
        ));
    }

    #[test]
    fn should_treat_zero_as_flame_detected() {
        let fire = route(&format!("devices/{ADDR}/sensor/flame"), b"0");
        let clear = route(&format!("devices/{ADDR}/sensor/flame"), b"1");
        assert!(matches!(
            fire,
            RoutedMessage::Sensor(SensorEvent {
                reading: SensorReading::Flame(true),
                ..
            })
        ));
        assert!(matches!(
            clear,
            RoutedMessage::Sensor(SensorEvent {
                reading: SensorReading::Flame(false),
                ..
            })
        ));
    }

    #[test]
    fn should_reject_short_topic() {
        assert_eq!(
            route("devices/AA", b"online"),
            RoutedMessage::Rejected(RejectReason::MalformedTopic("devices/AA".to_string()))
        );
    }

    #[test]
    fn should_reject_foreign_root() {
        assert!(matches!(
            route(&format!("sensors/{ADDR}/discovery"), b"online"),
            RoutedMessage::Rejected(RejectReason::MalformedTopic(_))
        ));
    }

    #[test]
    fn should_reject_empty_address() {
        assert!(matches!(
            route("devices//discovery", b"online"),
            RoutedMessage::Rejected(RejectReason::InvalidAddress(_))
        ));
    }

    #[test]
    fn should_reject_sensor_topic_without_kind() {
        assert!(matches!(
            route(&format!("devices/{ADDR}/sensor"), b"1"),
            RoutedMessage::Rejected(RejectReason::MissingSensorKind(_))
        ));
    }

    #[test]
    fn should_reject_unknown_sensor_kind() {
        assert_eq!(
            route(&format!("devices/{ADDR}/sensor/humidity"), b"40"),
            RoutedMessage::Rejected(RejectReason::UnknownSensorKind("humidity".to_string()))
        );
    }

    #[test]
    fn should_reject_non_utf8_payload() {
        assert_eq!(
            route(&format!("devices/{ADDR}/sensor/temp"), &[0xff, 0xfe]),
            RoutedMessage::Rejected(RejectReason::NonUtf8Payload)
        );
    }

    #[test]
    fn should_reject_unparseable_and_non_finite_values() {
        for payload in [&b"warm"[..], b"NaN", b"inf", b""] {
            assert!(matches!(
                route(&format!("devices/{ADDR}/sensor/temp"), payload),
                RoutedMessage::Rejected(RejectReason::InvalidValue { .. })
            ));
        }
        assert!(matches!(
            route(&format!("devices/{ADDR}/sensor/flame"), b"yes"),
            RoutedMessage::Rejected(RejectReason::InvalidValue {
                kind: SensorKind::Flame,
                ..
            })
        ));
    }

    #[test]
    fn should_ignore_other_categories() {
        assert_eq!(
            route(&format!("devices/{ADDR}/command"), b"actuate_alarm"),
            RoutedMessage::Ignored
        );
    }

    #[test]
    fn should_build_command_topic() {
        assert_eq!(command_topic(&addr()), format!("devices/{ADDR}/command"));
    }
}
