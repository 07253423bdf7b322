//! CAS URI validation.

use shared_crypto::is_base64url_string;
use shared_types::{ErrorCode, ProtocolParameters, SidetreeError};

/// Non-empty, within the length limit, base64url alphabet only.
pub fn validate_cas_uri(uri: &str, params: &ProtocolParameters) -> Result<(), SidetreeError> {
    if uri.is_empty() || uri.len() > params.max_cas_uri_length || !is_base64url_string(uri) {
        return Err(SidetreeError::new(
            ErrorCode::CasFileUriNotValid,
            format!("'{uri}' is not a valid CAS URI"),
        ));
    }
    Ok(())
}
