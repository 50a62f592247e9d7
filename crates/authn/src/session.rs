//! Session token issue and verification.
//!
//! Sessions are stateless EdDSA-signed bearer tokens. The process holds a
//! single Ed25519 keypair ([`SessionKey`]); every issued token is signed
//! with it and every presented token is verified against it. There is no
//! revocation list — a token dies when it expires or when the principal it
//! names no longer resolves in the directory (the service layer's
//! re-lookup).
//!
//! # Token Shape
//!
//! ```json
//! {
//!   "sub": "student:7f9c2ba4-e88f-11eb-9a03-0242ac130003",
//!   "iat": 1700000000,
//!   "exp": 1700086400
//! }
//! ```
//!
//! The subject encodes both the principal's kind and its stable id, so a
//! verified token can be re-looked-up without guessing which identity
//! space to search — and renames never invalidate it.

use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use ed25519_dalek::SigningKey;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use aulario_directory::PrincipalKind;
use aulario_storage::PrincipalId;

use crate::{error::AuthError, validation::validate_algorithm};

/// PKCS#8 DER header for an Ed25519 private key (RFC 8410). The 32-byte
/// seed follows directly after.
const PKCS8_ED25519_HEADER: [u8; 16] = [
    0x30, 0x2e, // SEQUENCE, 46 bytes
    0x02, 0x01, 0x00, // INTEGER version 0
    0x30, 0x05, // SEQUENCE, 5 bytes (algorithm identifier)
    0x06, 0x03, 0x2b, 0x65, 0x70, // OID 1.3.101.112 (Ed25519)
    0x04, 0x22, // OCTET STRING, 34 bytes
    0x04, 0x20, // OCTET STRING, 32 bytes (the seed)
];

/// Total length of an Ed25519 PKCS#8 DER document: header + seed.
const PKCS8_ED25519_LEN: usize = PKCS8_ED25519_HEADER.len() + 32;

/// Session token claims.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: `{kind}:{principal_id}`.
    pub sub: String,
    /// Expiration time (seconds since epoch).
    pub exp: u64,
    /// Issued at (seconds since epoch).
    pub iat: u64,
    /// Not before (optional, seconds since epoch).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<u64>,
}

impl SessionClaims {
    /// Builds claims for a principal, valid from now for `ttl`.
    #[must_use]
    pub fn for_principal(kind: PrincipalKind, id: &PrincipalId, ttl: Duration) -> Self {
        let now = Utc::now().timestamp() as u64;
        Self { sub: format!("{}:{}", kind.as_str(), id), exp: now + ttl.as_secs(), iat: now, nbf: None }
    }

    /// Parses the subject back into `(kind, principal_id)`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidSubject`] if the subject is not a
    /// well-formed `kind:id` pair.
    pub fn principal(&self) -> Result<(PrincipalKind, PrincipalId), AuthError> {
        let (kind_str, id_str) = self
            .sub
            .split_once(':')
            .ok_or_else(|| AuthError::invalid_subject("subject is not of the form kind:id"))?;

        let kind = PrincipalKind::parse(kind_str)
            .ok_or_else(|| AuthError::invalid_subject(format!("unknown kind '{kind_str}'")))?;

        if id_str.is_empty() {
            return Err(AuthError::invalid_subject("empty principal id"));
        }

        Ok((kind, PrincipalId::from(id_str)))
    }
}

/// The process-wide Ed25519 session keypair.
///
/// Loaded once at startup (see [`crate::config::SessionConfig`]) and shared
/// by every issuer and verifier in the process. There is no runtime
/// rotation; replacing the key invalidates all outstanding sessions, which
/// for day-long school sessions is an acceptable operational cost.
///
/// Private key material is held in [`Zeroizing`] buffers so it is scrubbed
/// from memory on drop.
pub struct SessionKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
    der: Zeroizing<Vec<u8>>,
    public_key_b64: String,
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print private material.
        f.debug_struct("SessionKey").field("public_key", &self.public_key_b64).finish()
    }
}

impl SessionKey {
    /// Generates a fresh random keypair.
    ///
    /// Intended for tests and for minting a key to put into configuration
    /// (`aulario` deployments generate once and set `AULARIO_SESSION_KEY`).
    #[must_use]
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let seed: Zeroizing<[u8; 32]> = Zeroizing::new(signing_key.to_bytes());

        let mut der = Zeroizing::new(PKCS8_ED25519_HEADER.to_vec());
        der.extend_from_slice(&*seed);

        // The DER was just built from a valid key, so this cannot fail.
        match Self::from_pkcs8_der(&der) {
            Ok(key) => key,
            Err(_) => unreachable!("freshly generated key material is always valid"),
        }
    }

    /// Builds a session key from an Ed25519 private key in PKCS#8 DER form.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidSessionKey`] if the bytes are not a
    /// well-formed Ed25519 PKCS#8 document.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self, AuthError> {
        if der.len() != PKCS8_ED25519_LEN || der[..PKCS8_ED25519_HEADER.len()] != PKCS8_ED25519_HEADER
        {
            return Err(AuthError::invalid_session_key(
                "expected a 48-byte Ed25519 PKCS#8 DER document",
            ));
        }

        let seed: Zeroizing<[u8; 32]> = Zeroizing::new(
            der[PKCS8_ED25519_HEADER.len()..]
                .try_into()
                .map_err(|_| AuthError::invalid_session_key("failed to extract seed"))?,
        );
        let signing_key = SigningKey::from_bytes(&seed);
        let public_key_b64 = URL_SAFE_NO_PAD.encode(signing_key.verifying_key().to_bytes());

        let decoding = DecodingKey::from_ed_components(&public_key_b64)
            .map_err(|e| AuthError::invalid_session_key(e.to_string()))?;

        Ok(Self {
            encoding: EncodingKey::from_ed_der(der),
            decoding,
            der: Zeroizing::new(der.to_vec()),
            public_key_b64,
        })
    }

    /// Builds a session key from a base64url-encoded (no padding) PKCS#8
    /// DER document, the format used in configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidSessionKey`] if the input is not valid
    /// base64url or not a valid key document.
    pub fn from_base64(encoded: &str) -> Result<Self, AuthError> {
        let der = Zeroizing::new(
            URL_SAFE_NO_PAD
                .decode(encoded.trim())
                .map_err(|e| AuthError::invalid_session_key(format!("invalid base64url: {e}")))?,
        );
        Self::from_pkcs8_der(&der)
    }

    /// The base64url encoding of the private key document, suitable for
    /// `AULARIO_SESSION_KEY`.
    #[must_use]
    pub fn to_base64(&self) -> String {
        URL_SAFE_NO_PAD.encode(&*self.der)
    }

    /// The base64url-encoded 32-byte public key.
    #[must_use]
    pub fn public_key_base64(&self) -> &str {
        &self.public_key_b64
    }
}

/// Issues a signed session token for the given claims.
///
/// # Errors
///
/// Returns an error if encoding fails (malformed key material).
pub fn issue(key: &SessionKey, claims: &SessionClaims) -> Result<String, AuthError> {
    let header = Header::new(Algorithm::EdDSA);
    Ok(jsonwebtoken::encode(&header, claims, &key.encoding)?)
}

/// Decodes a token header without verification.
///
/// # Errors
///
/// Returns an error if the token header cannot be decoded.
pub fn decode_session_header(token: &str) -> Result<Header, AuthError> {
    jsonwebtoken::decode_header(token).map_err(|e| {
        AuthError::invalid_token_format(format!("Failed to decode token header: {}", e))
    })
}

/// Decodes token claims without verification.
///
/// Useful for diagnostics and tests; never trust the result without a
/// subsequent [`verify`].
///
/// # Errors
///
/// Returns an error if:
/// - The token does not have exactly 3 parts
/// - The payload cannot be base64-decoded
/// - The payload cannot be parsed as JSON
/// - The `sub` claim is empty
pub fn decode_session_claims(token: &str) -> Result<SessionClaims, AuthError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(AuthError::invalid_token_format("token must have 3 parts separated by dots"));
    }

    let payload_bytes = URL_SAFE_NO_PAD.decode(parts[1]).map_err(|e| {
        AuthError::invalid_token_format(format!("Failed to decode token payload: {}", e))
    })?;

    let claims: SessionClaims = serde_json::from_slice(&payload_bytes).map_err(|e| {
        AuthError::invalid_token_format(format!("Failed to parse token claims: {}", e))
    })?;

    if claims.sub.is_empty() {
        return Err(AuthError::missing_claim("sub"));
    }

    Ok(claims)
}

/// Validates claim timestamps.
///
/// # Errors
///
/// Returns an error if:
/// - The token has expired
/// - The token is not yet valid (nbf in future)
/// - The issued-at is in the future
pub fn validate_claims(claims: &SessionClaims) -> Result<(), AuthError> {
    let now = Utc::now().timestamp() as u64;

    if claims.exp <= now {
        return Err(AuthError::token_expired());
    }

    if let Some(nbf) = claims.nbf
        && nbf > now
    {
        return Err(AuthError::token_not_yet_valid());
    }

    if claims.iat > now {
        return Err(AuthError::invalid_token_format("iat claim is in the future"));
    }

    Ok(())
}

/// Verifies a session token against the process key.
///
/// Checks, in order: header decodes, algorithm is EdDSA (never `none`,
/// never a symmetric algorithm), signature verifies, and claim timestamps
/// are valid.
///
/// # Errors
///
/// - [`AuthError::InvalidTokenFormat`] for malformed tokens
/// - [`AuthError::UnsupportedAlgorithm`] for forbidden or unknown algorithms
/// - [`AuthError::InvalidSignature`] if the signature doesn't verify
/// - [`AuthError::TokenExpired`] / [`AuthError::TokenNotYetValid`] on timestamp failures
pub fn verify(token: &str, key: &SessionKey) -> Result<SessionClaims, AuthError> {
    let header = decode_session_header(token)?;

    // Reject before any cryptography happens.
    let alg_str = format!("{:?}", header.alg);
    validate_algorithm(&alg_str)?;

    let mut validation = Validation::new(Algorithm::EdDSA);
    validation.validate_exp = true;
    validation.validate_nbf = false;
    validation.validate_aud = false;

    let token_data = decode::<SessionClaims>(token, &key.decoding, &validation)?;

    // nbf and iat sanity are ours to check.
    validate_claims(&token_data.claims)?;

    Ok(token_data.claims)
}
