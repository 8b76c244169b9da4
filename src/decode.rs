use std::fmt::Display;

use serde::de::DeserializeOwned;

use crate::{MarvelError, RawResponse};

/// Generic structured body: string keys mapped to JSON values.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

pub(crate) fn decode_json<T: DeserializeOwned>(response: &RawResponse) -> Result<T, MarvelError> {
    serde_json::from_slice::<T>(&response.body).map_err(|err| MarvelError::Deserialization {
        message: format!("invalid response JSON: {err}"),
        body: response.text(),
    })
}

pub(crate) fn decode_with<T, E, F>(response: &RawResponse, decode: F) -> Result<T, MarvelError>
where
    F: FnOnce(&[u8]) -> Result<T, E>,
    E: Display,
{
    decode(&response.body).map_err(|err| MarvelError::Deserialization {
        message: err.to_string(),
        body: response.text(),
    })
}
