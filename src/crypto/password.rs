use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::CryptoError;

pub const PBKDF2_ITERATIONS: u32 = 600_000;
pub const HASH_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 16;
pub const SCHEME: &str = "pbkdf2-sha256";

/// Hash a password for storage.
///
/// Encoded as `pbkdf2-sha256$<iterations>$<salt>$<hash>` with unpadded
/// base64 fields, so the work factor can be raised without invalidating
/// existing credentials.
pub fn hash_password(password: &str, iterations: u32) -> Result<String, CryptoError> {
    if iterations == 0 {
        return Err(CryptoError::InvalidIterations);
    }
    let salt = generate_salt();
    let derived = derive(password, &salt, iterations);
    Ok(format!(
        "{SCHEME}${iterations}${}${}",
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(derived.as_slice())
    ))
}

/// Check a password against a stored hash in constant time.
pub fn verify_password(password: &str, encoded: &str) -> Result<bool, CryptoError> {
    let parsed = ParsedHash::parse(encoded)?;
    let derived = derive(password, &parsed.salt, parsed.iterations);
    Ok(derived.as_slice().ct_eq(parsed.hash.as_slice()).into())
}

/// Iteration count recorded in a stored hash.
pub fn hash_iterations(encoded: &str) -> Result<u32, CryptoError> {
    Ok(ParsedHash::parse(encoded)?.iterations)
}

struct ParsedHash {
    iterations: u32,
    salt: Vec<u8>,
    hash: Zeroizing<Vec<u8>>,
}

impl ParsedHash {
    fn parse(encoded: &str) -> Result<Self, CryptoError> {
        let mut parts = encoded.split('$');
        let (Some(scheme), Some(iterations), Some(salt), Some(hash), None) =
            (parts.next(), parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CryptoError::MalformedHash);
        };
        if scheme != SCHEME {
            return Err(CryptoError::UnsupportedScheme(scheme.to_string()));
        }
        let iterations: u32 = iterations.parse().map_err(|_| CryptoError::MalformedHash)?;
        if iterations == 0 {
            return Err(CryptoError::InvalidIterations);
        }
        let salt = STANDARD_NO_PAD
            .decode(salt)
            .map_err(|_| CryptoError::MalformedHash)?;
        let hash = Zeroizing::new(
            STANDARD_NO_PAD
                .decode(hash)
                .map_err(|_| CryptoError::MalformedHash)?,
        );
        if salt.is_empty() || hash.len() != HASH_LENGTH {
            return Err(CryptoError::MalformedHash);
        }
        Ok(Self { iterations, salt, hash })
    }
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> Zeroizing<[u8; HASH_LENGTH]> {
    let mut out = Zeroizing::new([0u8; HASH_LENGTH]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out[..]);
    out
}

/// Generate a cryptographically random salt
fn generate_salt() -> [u8; SALT_LENGTH] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}
