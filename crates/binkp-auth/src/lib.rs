//! Plaintext and CRAM-MD5 authentication.
#![forbid(unsafe_code)]

use digest::Mac;
use hmac::Hmac;
use md5::Md5;
use thiserror::Error;

type HmacMd5 = Hmac<Md5>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("password mismatch")]
    PasswordMismatch,

    #[error("CRAM-MD5 response does not match the expected digest")]
    CramMismatch,

    #[error("challenge {0:?} is not valid hex")]
    InvalidChallengeHex(String),

    #[error("M_PWD argument {0:?} is not a CRAM-MD5 response")]
    NotACramResponse(String),
}

/// Computes the lowercase-hex CRAM-MD5 response for `challenge` under
/// `password`.
///
/// Computes `HMAC-MD5` with the password as key and the *hex-decoded
/// bytes* of the textual challenge as message, matching the classic
/// CRAM-MD5 worked example (`HMAC_MD5(key="secret",
/// msg=bytes.fromhex("deadbeef"))`). See DESIGN.md for the reasoning
/// behind this convention.
pub fn cram_md5_response(password: &[u8], challenge: &str) -> Result<String, AuthError> {
    let challenge_bytes = decode_hex(challenge)?;
    let mut mac =
        HmacMd5::new_from_slice(password).expect("HMAC-MD5 accepts keys of any length");
    mac.update(&challenge_bytes);
    Ok(encode_hex(&mac.finalize().into_bytes()))
}

/// Builds the `M_PWD` argument the originator sends for a given mode.
pub fn build_pwd_argument(password: &str, challenge: Option<&str>) -> Result<String, AuthError> {
    match challenge {
        Some(challenge) => Ok(format!(
            "CRAM-MD5-{}",
            cram_md5_response(password.as_bytes(), challenge)?
        )),
        None => Ok(password.to_string()),
    }
}

/// Verifies an incoming `M_PWD` argument against the expected password,
/// optionally under a CRAM-MD5 challenge this side issued.
///
/// Plaintext comparison is byte-exact.
pub fn verify_pwd_argument(
    pwd_argument: &str,
    expected_password: &str,
    challenge: Option<&str>,
) -> Result<(), AuthError> {
    match challenge {
        Some(challenge) => {
            let response = pwd_argument
                .strip_prefix("CRAM-MD5-")
                .ok_or_else(|| AuthError::NotACramResponse(pwd_argument.to_string()))?;
            let expected = cram_md5_response(expected_password.as_bytes(), challenge)?;
            if constant_time_eq(response.as_bytes(), expected.as_bytes()) {
                Ok(())
            } else {
                Err(AuthError::CramMismatch)
            }
        }
        None => {
            if constant_time_eq(pwd_argument.as_bytes(), expected_password.as_bytes()) {
                Ok(())
            } else {
                Err(AuthError::PasswordMismatch)
            }
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

fn decode_hex(s: &str) -> Result<Vec<u8>, AuthError> {
    if s.len() % 2 != 0 {
        return Err(AuthError::InvalidChallengeHex(s.to_string()));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&s[i..i + 2], 16)
                .map_err(|_| AuthError::InvalidChallengeHex(s.to_string()))
        })
        .collect()
}
