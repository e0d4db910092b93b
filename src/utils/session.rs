//! Session id generation and validation.

use super::config::SESSION_ID_LEN;
use super::error::InstrumentError;

/// Generate a random session id of `SESSION_ID_LEN` lowercase hex characters
pub fn generate_session_id() -> Result<String, InstrumentError> {
    let mut bytes = [0u8; SESSION_ID_LEN / 2];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| InstrumentError::SessionIdUnavailable(e.to_string()))?;
    Ok(hex::encode(bytes))
}

/// Check that a user-supplied session id is safe to embed in emitted code
/// and in the trace grammar.
pub fn validate_session_id(id: &str) -> Result<(), InstrumentError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if valid {
        Ok(())
    } else {
        Err(InstrumentError::InvalidSessionId(id.to_string()))
    }
}

/// Check a session id used to filter logs
///
/// Looser than `validate_session_id`: any token the trace grammar can
/// carry is accepted, so logs from other tools stay filterable.
pub fn validate_session_filter(id: &str) -> Result<(), InstrumentError> {
    if id.is_empty() || id.contains(['|', ']']) {
        return Err(InstrumentError::InvalidSessionFilter(id.to_string()));
    }
    Ok(())
}

/// Use the supplied id when present, otherwise generate one
pub fn resolve_session_id(custom: Option<&str>) -> Result<String, InstrumentError> {
    match custom {
        Some(id) => {
            validate_session_id(id)?;
            Ok(id.to_string())
        }
        None => generate_session_id(),
    }
}
