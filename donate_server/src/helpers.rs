use hmac::{Hmac, Mac};
use rand::{distributions::Alphanumeric, Rng};
use regex::Regex;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// The lowercase hex HMAC-SHA256 signature of `payload` under `secret`. EasyDonate signs webhook notifications
/// over the string `"{payment_id}@{cost}@{customer}"`.
pub fn calculate_hmac(secret: &str, payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any size");
    mac.update(payload.as_bytes());
    mac.finalize().into_bytes().iter().map(|b| format!("{b:02x}")).collect()
}

/// Verify a hex-encoded HMAC-SHA256 signature in constant time.
pub fn verify_hmac(secret: &str, payload: &str, signature_hex: &str) -> bool {
    let Some(signature) = decode_hex(signature_hex) else {
        return false;
    };
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any size");
    mac.update(payload.as_bytes());
    mac.verify_slice(&signature).is_ok()
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    let s = s.trim();
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len()).step_by(2).map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok()).collect()
}

pub fn is_valid_email(email: &str) -> bool {
    let re = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid");
    re.is_match(email)
}

/// Minecraft account names: 3 to 16 characters from `[A-Za-z0-9_]`.
pub fn is_valid_nickname(nickname: &str) -> bool {
    let re = Regex::new(r"^[A-Za-z0-9_]{3,16}$").expect("nickname regex is valid");
    re.is_match(nickname)
}

/// A random throwaway credential for buyers created through guest checkout.
pub fn random_credential() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(24).map(char::from).collect()
}
