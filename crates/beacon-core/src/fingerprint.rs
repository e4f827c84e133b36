//! Message fingerprinting for console dedup.
//!
//! Canonicalises a message so that variants of "the same" error collapse to
//! one bucket: UUIDs become `{uuid}`, ISO-8601 timestamps become `{ts}`, and
//! integers of four or more digits become `{n}`. Timestamps are replaced
//! before bare integers so their embedded digit runs are not consumed.
//! Small numbers (three digits or fewer) are preserved.

use std::sync::OnceLock;

use regex::Regex;

fn uuid_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
            .expect("uuid pattern compiles")
    })
}

fn timestamp_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?Z?")
            .expect("timestamp pattern compiles")
    })
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{4,}").expect("number pattern compiles"))
}

/// Canonicalise a message for dedup grouping.
pub fn fingerprint_message(message: &str) -> String {
    let out = uuid_re().replace_all(message, "{uuid}");
    let out = timestamp_re().replace_all(&out, "{ts}");
    let out = number_re().replace_all(&out, "{n}");
    out.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_replaced() {
        assert_eq!(
            fingerprint_message("order 550e8400-e29b-41d4-a716-446655440000 failed"),
            "order {uuid} failed"
        );
    }

    #[test]
    fn test_timestamp_replaced_before_numbers() {
        assert_eq!(
            fingerprint_message("slow at 2024-01-01T10:00:00Z"),
            "slow at {ts}"
        );
        assert_eq!(
            fingerprint_message("slow at 2024-01-01T10:00:00.123Z again"),
            "slow at {ts} again"
        );
    }

    #[test]
    fn test_large_numbers_replaced_small_preserved() {
        assert_eq!(fingerprint_message("order 1234 failed"), "order {n} failed");
        assert_eq!(fingerprint_message("retry 3 of 5"), "retry 3 of 5");
        assert_eq!(fingerprint_message("status 404"), "status 404");
    }

    #[test]
    fn test_equal_fingerprints_for_variant_messages() {
        let a = fingerprint_message("Order 1234 failed id 550e8400-e29b-41d4-a716-446655440000");
        let b = fingerprint_message("Order 9999 failed id 550e8400-e29b-41d4-a716-446655440111");
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_messages_stay_distinct() {
        assert_ne!(
            fingerprint_message("payment declined"),
            fingerprint_message("payment accepted")
        );
    }
}
