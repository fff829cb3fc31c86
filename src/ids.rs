//! Human-readable record identifiers.
//!
//! Ids look like `ORD-LX3K9Q2A-7F2C`: prefix, the creation time in epoch
//! milliseconds as uppercase base36, and four random base36 characters.
//! Collisions are only guarded by millisecond + random entropy, which is
//! enough for a single shop's order volume.

use chrono::Utc;
use rand::Rng;

pub const ORDER_PREFIX: &str = "ORD";
pub const PRODUCT_PREFIX: &str = "PROD";

const SUFFIX_LEN: usize = 4;
const UPLOAD_SUFFIX_LEN: usize = 6;
const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

fn random_base36(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

fn now_millis() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// `<PREFIX>-<base36 millis>-<4 random base36>`.
pub fn new_id(prefix: &str) -> String {
    format!(
        "{prefix}-{}-{}",
        to_base36(now_millis()),
        random_base36(SUFFIX_LEN)
    )
}

pub fn order_id() -> String {
    new_id(ORDER_PREFIX)
}

pub fn product_id() -> String {
    new_id(PRODUCT_PREFIX)
}

/// Tracking input routing: anything starting with `ORD-` is an order id,
/// everything else is treated as a phone number.
pub fn looks_like_order_id(input: &str) -> bool {
    input.starts_with("ORD-")
}

/// Object name for an uploaded file: `<millis>-<6 random>.<ext>`.
///
/// Unlike record ids the random part is lowercase, matching what is
/// already stored in the bucket.
pub fn upload_file_name(extension: &str) -> String {
    format!(
        "{}-{}.{}",
        now_millis(),
        random_base36(UPLOAD_SUFFIX_LEN).to_ascii_lowercase(),
        extension
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_upper_base36(s: &str) -> bool {
        !s.is_empty() && s.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
    }

    #[test]
    fn test_base36_encoding() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "Z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1_700_000_000_000), "LOYW3V28");
    }

    #[test]
    fn test_order_id_shape() {
        let id = order_id();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3, "unexpected id {id}");
        assert_eq!(parts[0], "ORD");
        assert!(is_upper_base36(parts[1]));
        assert_eq!(parts[2].len(), 4);
        assert!(is_upper_base36(parts[2]));
    }

    #[test]
    fn test_product_id_prefix() {
        assert!(product_id().starts_with("PROD-"));
    }

    #[test]
    fn test_looks_like_order_id() {
        assert!(looks_like_order_id("ORD-ABC-1234"));
        assert!(!looks_like_order_id("ord-abc-1234"));
        assert!(!looks_like_order_id("+919876543210"));
        assert!(!looks_like_order_id(" ORD-ABC-1234"));
    }

    #[test]
    fn test_upload_file_name() {
        let name = upload_file_name("png");
        assert!(name.ends_with(".png"));
        let stem = name.trim_end_matches(".png");
        let (millis, suffix) = stem.split_once('-').expect("dash separator");
        assert!(millis.parse::<u64>().is_ok());
        assert_eq!(suffix.len(), 6);
    }
}
