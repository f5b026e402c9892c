use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub fn hmac_sha256_hex(secret: &[u8], payload: &[u8]) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(payload);
    encode_hex(mac.finalize().into_bytes().as_slice())
}

/// Constant-time check of a hex-encoded HMAC-SHA256 signature.
pub fn verify_hmac_sha256_hex(secret: &[u8], payload: &[u8], expected_hex: &str) -> bool {
    let Some(expected) = decode_hex(expected_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        output.push_str(&format!("{byte:02x}"));
    }
    output
}

fn decode_hex(raw: &str) -> Option<Vec<u8>> {
    if raw.len() % 2 != 0 {
        return None;
    }

    (0..raw.len())
        .step_by(2)
        .map(|index| raw.get(index..index + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{hmac_sha256_hex, verify_hmac_sha256_hex};

    #[test]
    fn matches_rfc_4231_vector() {
        // RFC 4231 test case 2
        let signature = hmac_sha256_hex(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(
            signature,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn verifies_its_own_signatures() {
        let signature = hmac_sha256_hex(b"secret", b"payload");
        assert!(verify_hmac_sha256_hex(b"secret", b"payload", &signature));
        assert!(verify_hmac_sha256_hex(b"secret", b"payload", &signature.to_ascii_uppercase()));
    }

    #[test]
    fn rejects_tampered_or_malformed_signatures() {
        let signature = hmac_sha256_hex(b"secret", b"payload");
        assert!(!verify_hmac_sha256_hex(b"secret", b"payload!", &signature));
        assert!(!verify_hmac_sha256_hex(b"other", b"payload", &signature));
        assert!(!verify_hmac_sha256_hex(b"secret", b"payload", "zz"));
        assert!(!verify_hmac_sha256_hex(b"secret", b"payload", "abc"));
    }
}
