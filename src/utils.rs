//! Utility functions for the Hedera MCP server

use serde::de::DeserializeOwned;
use serde_json::{from_value, Value};
use validator::Validate;

use crate::blockchain::models::{LedgerError, LedgerResult};

/// Deserialize raw tool arguments into a parameter struct and run its shape validation.
///
/// This is the validation phase only: defaults and lookups happen later in the normaliser.
pub fn parse_tool_args<T: DeserializeOwned + Validate>(args: &Value) -> LedgerResult<T> {
    let params: T = from_value(args.clone())
        .map_err(|e| LedgerError::Validation(format!("Invalid parameters: {}", e)))?;
    params.validate()?;
    Ok(params)
}

/// Serde adapter encoding byte vectors as standard base64 strings.
pub mod base64_bytes {
    use base64::{engine::general_purpose, Engine as _};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(de::Error::custom)
    }
}

/// Serde adapter encoding byte vectors as 0x-less hex strings.
pub mod hex_bytes {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        hex::decode(encoded.trim_start_matches("0x")).map_err(de::Error::custom)
    }
}
