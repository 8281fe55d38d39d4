use sha2::{Digest, Sha256};

const SAMPLE_BYTES: usize = 64;

/// Cheap content fingerprint: length combined with prefix, midpoint, and
/// suffix samples, hashed. Cache entries carry this sidecar and are dropped
/// when it no longer matches the live content.
pub fn content_hash(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut hasher = Sha256::new();
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(&bytes[..SAMPLE_BYTES.min(bytes.len())]);
    if bytes.len() > SAMPLE_BYTES {
        let mid = bytes.len() / 2;
        let end = (mid + SAMPLE_BYTES).min(bytes.len());
        hasher.update(&bytes[mid..end]);
        hasher.update(&bytes[bytes.len().saturating_sub(SAMPLE_BYTES)..]);
    }
    let digest = hasher.finalize();
    digest[..16].iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_for_same_content() {
        assert_eq!(content_hash("hello world"), content_hash("hello world"));
    }

    #[test]
    fn differs_on_change() {
        assert_ne!(content_hash("hello"), content_hash("hello world"));
        let a = "x".repeat(500);
        let mut b = a.clone();
        b.replace_range(250..251, "y");
        assert_ne!(content_hash(&a), content_hash(&b));
    }

    #[test]
    fn handles_short_and_empty_inputs() {
        assert_eq!(content_hash("").len(), 32);
        assert_eq!(content_hash("a").len(), 32);
    }
}
