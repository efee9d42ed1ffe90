//! Domain layer types and invariants.

pub mod error;
pub mod request;
pub mod response;

use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

/// Deserialize an explicit `null` the same way as a missing field.
///
/// Workers echo request state back and may send `null` for any part of it.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Shallow-merge `patch` over the serialized form of `base`.
///
/// Top-level keys in `patch` replace the corresponding keys wholesale; nested
/// objects are not merged recursively.
pub(crate) fn overlay<T>(base: &T, patch: &Map<String, Value>) -> Result<T, serde_json::Error>
where
    T: Serialize + DeserializeOwned,
{
    let mut value = serde_json::to_value(base)?;
    if let Value::Object(fields) = &mut value {
        for (key, replacement) in patch {
            fields.insert(key.clone(), replacement.clone());
        }
    }
    serde_json::from_value(value)
}
