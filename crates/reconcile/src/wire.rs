//! JSON wire form of [`Value`]
//!
//! Plain data maps to plain JSON. The two markers use the engine's
//! conventions:
//!
//! - a secret is an object `{"<SIG_KEY>": "<SECRET_SIG>", "value": ...}`
//! - an unknown is the string [`UNKNOWN_SENTINEL`]

use crate::error::{Error, Result};
use crate::value::{PropertyMap, Value};

/// Object key that marks a special (signed) value
pub const SIG_KEY: &str = "4dabf18193072939515e22adb298388d";

/// Signature of a secret value
pub const SECRET_SIG: &str = "1b47061264138c4ac30d75fd1eb44270";

/// String that stands for an unknown value
pub const UNKNOWN_SENTINEL: &str = "04da6b54-80e4-46f7-96ec-b56ff0331ba9";

/// Encode a value into its wire JSON
pub fn encode(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Array(items) => serde_json::Value::Array(items.iter().map(encode).collect()),
        Value::Object(map) => encode_map(map),
        Value::Secret(inner) => {
            let mut obj = serde_json::Map::new();
            obj.insert(SIG_KEY.into(), serde_json::Value::String(SECRET_SIG.into()));
            obj.insert("value".into(), encode(inner));
            serde_json::Value::Object(obj)
        }
        Value::Unknown => serde_json::Value::String(UNKNOWN_SENTINEL.into()),
    }
}

/// Encode a property map into a wire JSON object
pub fn encode_map(map: &PropertyMap) -> serde_json::Value {
    serde_json::Value::Object(map.iter().map(|(k, v)| (k.clone(), encode(v))).collect())
}

/// Decode wire JSON into a value
pub fn decode(json: serde_json::Value) -> Result<Value> {
    match json {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
        serde_json::Value::Number(n) => n
            .as_f64()
            .map(Value::Number)
            .ok_or_else(|| Error::InvalidInput(format!("number {n} is out of range"))),
        serde_json::Value::String(s) if s == UNKNOWN_SENTINEL => Ok(Value::Unknown),
        serde_json::Value::String(s) => Ok(Value::String(s)),
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(decode)
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        serde_json::Value::Object(mut obj) => match obj.remove(SIG_KEY) {
            Some(serde_json::Value::String(sig)) if sig == SECRET_SIG => {
                let inner = obj.remove("value").unwrap_or(serde_json::Value::Null);
                Ok(Value::secret(decode(inner)?))
            }
            Some(sig) => Err(Error::InvalidInput(format!(
                "unrecognized value signature {sig}"
            ))),
            None => decode_object(obj).map(Value::Object),
        },
    }
}

/// Decode a wire JSON object into a property map
pub fn decode_map(json: serde_json::Value) -> Result<PropertyMap> {
    match json {
        serde_json::Value::Object(obj) => decode_object(obj),
        serde_json::Value::Null => Ok(PropertyMap::new()),
        other => Err(Error::InvalidInput(format!(
            "expected an object, found {other}"
        ))),
    }
}

fn decode_object(obj: serde_json::Map<String, serde_json::Value>) -> Result<PropertyMap> {
    let mut map = PropertyMap::new();
    for (key, value) in obj {
        map.insert(key, decode(value)?);
    }
    Ok(map)
}
