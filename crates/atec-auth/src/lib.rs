//! atec-auth
//!
//! Account lifecycle: signup with e-mail verification, login, password
//! reset, resend verification, and account deletion. Also owns the shared
//! cryptor used for deterministic field encryption, password hashing, and
//! HS256 tokens.

pub mod crypto;
pub mod error;
pub mod flows;
pub mod jwt;
pub mod mail;
mod templates;

pub use crypto::SharedCryptor;
pub use error::{CryptoError, MailError};
pub use flows::{AuthService, AuthSettings};
pub use jwt::{TokenClaims, TokenKind, TokenRejection};
pub use mail::{BrevoMailer, LogMailer, Mailer, OutgoingMail};
