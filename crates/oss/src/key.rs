use crate::AuthorizationError;

/// Validates an object key handed out by the metadata service.
///
/// The key is appended verbatim to the destination host, so it must stay
/// a relative path inside the bucket. Rejects:
/// - Empty keys
/// - Keys starting with `/` or `\`
/// - `..` segments (either separator)
/// - Control characters, which would corrupt the request line
pub fn validate_object_key(key: &str) -> Result<(), AuthorizationError> {
    if key.is_empty() {
        return Err(AuthorizationError::InvalidObjectKey("empty key".into()));
    }

    if key.starts_with('/') || key.starts_with('\\') {
        return Err(AuthorizationError::InvalidObjectKey(format!(
            "absolute key not allowed: {key}"
        )));
    }

    if key.chars().any(char::is_control) {
        return Err(AuthorizationError::InvalidObjectKey(format!(
            "control character in key: {key:?}"
        )));
    }

    if key.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(AuthorizationError::InvalidObjectKey(format!(
            "parent segment not allowed: {key}"
        )));
    }

    Ok(())
}
