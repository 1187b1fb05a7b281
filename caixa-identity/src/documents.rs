// Document encode/decode helpers shared by the engine's parts.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use caixa_core::{IdentityError, IdentityResult};

pub(crate) fn decode<T: DeserializeOwned>(doc: Value) -> IdentityResult<T> {
    serde_json::from_value(doc).map_err(|err| IdentityError::Decode(err.to_string()))
}

pub(crate) fn encode<T: Serialize>(record: &T) -> IdentityResult<Value> {
    serde_json::to_value(record).map_err(|err| IdentityError::Decode(err.to_string()))
}
