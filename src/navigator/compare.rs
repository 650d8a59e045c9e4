//! Screen capture comparison strategies

use sha2::{Digest, Sha256};

/// Decides whether a capture matches its golden reference
pub trait ImageComparator: Send + Sync {
    fn name(&self) -> &'static str;

    fn images_match(&self, expected: &[u8], actual: &[u8]) -> bool;
}

/// Byte-for-byte equality of the encoded images
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactBytes;

impl ImageComparator for ExactBytes {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn images_match(&self, expected: &[u8], actual: &[u8]) -> bool {
        expected == actual
    }
}

/// SHA-256 digest equality
///
/// The golden may be the image itself or a text file holding the hex digest
/// of the image, which keeps large golden sets out of version control.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Digest;

impl ImageComparator for Sha256Digest {
    fn name(&self) -> &'static str {
        "sha256"
    }

    fn images_match(&self, expected: &[u8], actual: &[u8]) -> bool {
        let actual = digest(actual);
        match std::str::from_utf8(expected).map(str::trim) {
            Ok(text) if is_hex_digest(text) => text.eq_ignore_ascii_case(&actual),
            _ => digest(expected) == actual,
        }
    }
}

/// Hex SHA-256 of a capture
pub fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn is_hex_digest(text: &str) -> bool {
    text.len() == 64 && text.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Comparator by name, as given on the command line
pub fn by_name(name: &str) -> Option<Box<dyn ImageComparator>> {
    match name {
        "exact" => Some(Box::new(ExactBytes)),
        "sha256" => Some(Box::new(Sha256Digest)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_bytes() {
        assert!(ExactBytes.images_match(b"png", b"png"));
        assert!(!ExactBytes.images_match(b"png", b"pnG"));
    }

    #[test]
    fn test_digest_accepts_image_or_digest_file() {
        let image = b"\x89PNG fake image";
        assert!(Sha256Digest.images_match(image, image));
        assert!(!Sha256Digest.images_match(image, b"other"));

        let golden = format!("{}\n", digest(image));
        assert!(Sha256Digest.images_match(golden.as_bytes(), image));
        assert!(Sha256Digest.images_match(golden.to_uppercase().as_bytes(), image));
        assert!(!Sha256Digest.images_match(golden.as_bytes(), b"other"));
    }

    #[test]
    fn test_by_name() {
        assert_eq!(by_name("exact").map(|c| c.name()), Some("exact"));
        assert_eq!(by_name("sha256").map(|c| c.name()), Some("sha256"));
        assert!(by_name("perceptual").is_none());
    }
}
