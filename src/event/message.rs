//! Envelope: a dispatched message plus the name of the app that sent it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What every observer receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Channel of the sender: an app name, or the shell channel for the host.
    #[serde(rename = "app")]
    pub sender: String,
    /// The message payload.
    pub message: Value,
}

impl Envelope {
    /// Create an envelope from `sender`.
    pub fn new(sender: impl Into<String>, message: impl Into<Value>) -> Self {
        Self {
            sender: sender.into(),
            message: message.into(),
        }
    }

    /// Whether this envelope was sent by `app`.
    pub fn is_from(&self, app: &str) -> bool {
        self.sender == app
    }

    /// Deserialize the payload into a concrete type.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Login {
        user: String,
    }

    #[test]
    fn new_and_is_from() {
        let env = Envelope::new("navbar", json!({"user": "ada"}));
        assert!(env.is_from("navbar"));
        assert!(!env.is_from("left"));
    }

    #[test]
    fn decode_payload() {
        let env = Envelope::new("login", json!({"user": "ada"}));
        assert_eq!(env.decode::<Login>().unwrap(), Login { user: "ada".into() });
        assert!(Envelope::new("login", 3).decode::<Login>().is_err());
    }

    #[test]
    fn serializes_sender_as_app() {
        let env = Envelope::new("left", "hi");
        assert_eq!(
            serde_json::to_value(&env).unwrap(),
            json!({"app": "left", "message": "hi"})
        );
    }
}
