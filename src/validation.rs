use bs58;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid address format: {0}")]
    InvalidAddress(String),

    #[error("Invalid approval program hash: {0}")]
    InvalidApprovalHash(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Decode a base58 string that must hold exactly 32 bytes.
fn decode_32(value: &str) -> Option<[u8; 32]> {
    let decoded = bs58::decode(value).into_vec().ok()?;
    decoded.try_into().ok()
}

pub fn validate_address(address: &str) -> Result<[u8; 32], ValidationError> {
    if address.trim().is_empty() {
        return Err(ValidationError::MissingParameter("address".to_string()));
    }

    decode_32(address.trim()).ok_or_else(|| ValidationError::InvalidAddress(address.to_string()))
}

pub fn validate_approval_hash(hash: &str) -> Result<(), ValidationError> {
    if hash.trim().is_empty() {
        return Err(ValidationError::MissingParameter("approval hash".to_string()));
    }

    match decode_32(hash.trim()) {
        Some(_) => Ok(()),
        None => Err(ValidationError::InvalidApprovalHash(hash.to_string())),
    }
}

pub fn validate_batch_size(name: &str, value: u32) -> Result<u32, ValidationError> {
    if value == 0 {
        return Err(ValidationError::InvalidParameter(format!("{} must be positive", name)));
    }
    Ok(value)
}
