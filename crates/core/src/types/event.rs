//! Analytics event types.

use serde::{Deserialize, Serialize};

/// Kind of an append-only analytics event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PageView,
    BuyClick,
    BeginCheckout,
}

impl EventType {
    /// Wire/storage identifier for this event type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PageView => "page_view",
            Self::BuyClick => "buy_click",
            Self::BeginCheckout => "begin_checkout",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "page_view" => Ok(Self::PageView),
            "buy_click" => Ok(Self::BuyClick),
            "begin_checkout" => Ok(Self::BeginCheckout),
            _ => Err(format!("invalid event type: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_identifiers() {
        for ty in [EventType::PageView, EventType::BuyClick, EventType::BeginCheckout] {
            let parsed: EventType = ty.as_str().parse().expect("parse");
            assert_eq!(parsed, ty);
        }
        assert!("purchase".parse::<EventType>().is_err());
    }
}
