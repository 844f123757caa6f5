//! Status types for orders.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Order status.
///
/// The document store holds the status as a free-form string; known values
/// get variants, anything else round-trips through [`OrderStatus::Other`]
/// rather than failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    /// Order has been placed at checkout.
    Placed,
    /// Any other status string present in the store.
    Other(String),
}

impl Default for OrderStatus {
    fn default() -> Self {
        Self::Placed
    }
}

impl OrderStatus {
    /// The status as it is stored.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Placed => "placed",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for OrderStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "placed" => Self::Placed,
            _ => Self::Other(s),
        }
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_owned()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_known_status() {
        let status: OrderStatus = serde_json::from_str("\"placed\"").unwrap();
        assert_eq!(status, OrderStatus::Placed);
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"placed\"");
    }

    #[test]
    fn test_unknown_status_round_trips() {
        let status: OrderStatus = serde_json::from_str("\"shipped\"").unwrap();
        assert_eq!(status, OrderStatus::Other("shipped".to_owned()));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"shipped\"");
    }
}
