//! Base64 representation of binary render output.

use ::base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::WireError;

pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Leading and trailing whitespace is accepted and ignored; any other
/// non-alphabet character is an error.
pub fn decode(text: &str) -> Result<Vec<u8>, WireError> {
    Ok(STANDARD.decode(text.trim())?)
}

/// Serde adapter keeping bytes raw in memory and base64 on the wire.
///
/// Use with `#[serde(with = "delegate_wire::content::base64")]`.
pub mod base64 {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        super::decode(&text).map_err(D::Error::custom)
    }
}
