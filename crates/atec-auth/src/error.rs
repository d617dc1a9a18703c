use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("iv must be {expected} hex-encoded bytes, got {actual}")]
    InvalidIv { expected: usize, actual: usize },

    #[error("hex decode failed: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("cipher setup failed")]
    Cipher,

    #[error("ciphertext padding is invalid")]
    Padding,

    #[error("plaintext is not valid utf-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("password hash is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("bcrypt error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("mail provider rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}
