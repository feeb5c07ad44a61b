use sha2::{Digest, Sha256};

/// OCI content digests are `sha256:` followed by 64 lowercase hex characters.
pub const DIGEST_PREFIX: &str = "sha256:";

pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{}{}", DIGEST_PREFIX, hex::encode(hasher.finalize()))
}

pub fn sha256_string(data: &str) -> String {
    sha256_bytes(data.as_bytes())
}

/// The hex portion of a digest, for `blobs/sha256/<hex>` paths.
pub fn digest_hex(digest: &str) -> &str {
    digest.strip_prefix(DIGEST_PREFIX).unwrap_or(digest)
}

/// Whether a string is a well-formed content digest.
pub fn is_digest(s: &str) -> bool {
    match s.strip_prefix(DIGEST_PREFIX) {
        Some(hex) => hex.len() == 64 && hex.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_value() {
        // sha256 of the empty string
        assert_eq!(
            sha256_string(""),
            "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_digest_hex_strips_prefix() {
        assert_eq!(digest_hex("sha256:abcd"), "abcd");
        assert_eq!(digest_hex("abcd"), "abcd");
    }

    #[test]
    fn test_is_digest() {
        assert!(is_digest(&sha256_bytes(b"anything")));
        assert!(!is_digest("sha256:tooshort"));
        assert!(!is_digest("md5:aaaa"));
        assert!(!is_digest(""));
    }
}
