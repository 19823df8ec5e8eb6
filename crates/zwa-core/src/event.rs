//! Bus events
//!
//! Events travel as JSON so that subscribers can pick the payloads they
//! understand and skip the rest. Typed payloads implement [`EventData`].

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A payload type with a fixed event type name
pub trait EventData: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const EVENT_TYPE: &'static str;
}

/// Name of an event type, e.g. `zwave.node_status`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(Cow<'static, str>);

impl EventType {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for EventType {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for EventType {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An event with its payload and the time it entered the bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T = Value> {
    pub event_type: EventType,
    pub data: T,
    pub received_at: DateTime<Utc>,
}

impl<T> Event<T> {
    pub fn new(event_type: impl Into<EventType>, data: T) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            received_at: Utc::now(),
        }
    }
}

impl Event<Value> {
    /// Wrap a typed payload for the bus
    pub fn encode<T: EventData>(data: &T) -> serde_json::Result<Self> {
        Ok(Self::new(T::EVENT_TYPE, serde_json::to_value(data)?))
    }

    /// The payload as `T`, if this event has `T`'s type and the data fits
    pub fn decode<T: EventData>(&self) -> Option<Event<T>> {
        if self.event_type.as_str() != T::EVENT_TYPE {
            return None;
        }
        let data = T::deserialize(&self.data).ok()?;
        Some(Event {
            event_type: self.event_type.clone(),
            data,
            received_at: self.received_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Ping {
        seq: u32,
    }

    impl EventData for Ping {
        const EVENT_TYPE: &'static str = "test.ping";
    }

    #[test]
    fn test_encode_decode() {
        let event = Event::encode(&Ping { seq: 3 }).unwrap();
        assert_eq!(event.event_type.as_str(), "test.ping");
        assert_eq!(event.data["seq"], 3);

        let typed = event.decode::<Ping>().unwrap();
        assert_eq!(typed.data, Ping { seq: 3 });
        assert_eq!(typed.received_at, event.received_at);
    }

    #[test]
    fn test_decode_checks_type_and_shape() {
        let wrong_type = Event::new("test.pong", serde_json::json!({"seq": 1}));
        assert!(wrong_type.decode::<Ping>().is_none());

        let wrong_shape = Event::new("test.ping", serde_json::json!({"seq": "one"}));
        assert!(wrong_shape.decode::<Ping>().is_none());
    }

    #[test]
    fn test_event_type_serializes_as_string() {
        let ty = EventType::from(String::from("zwave.node_status"));
        assert_eq!(serde_json::to_value(&ty).unwrap(), "zwave.node_status");
        assert_eq!(ty, EventType::from_static("zwave.node_status"));
    }
}
