// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

pub mod shutdown;

#[macro_export]
macro_rules! mailbot_version {
    () => {
        env!("CARGO_PKG_VERSION")
    };
}

#[macro_export]
macro_rules! utc_now {
    () => {{
        use chrono::Utc;
        Utc::now().timestamp_millis()
    }};
}

#[macro_export]
macro_rules! days_to_millis {
    ($days:expr) => {{
        const MILLIS_PER_DAY: i64 = 86_400_000; // 24 * 60 * 60 * 1000
        ($days as i64) * MILLIS_PER_DAY
    }};
}

#[macro_export]
macro_rules! base64_decode_url_safe {
    ($key:expr) => {{
        use base64::{engine::general_purpose::URL_SAFE, *};
        URL_SAFE.decode($key)
    }};
}

#[macro_export]
macro_rules! raise_error {
    ($msg:expr, $code:expr) => {
        $crate::modules::error::MailbotError::Generic {
            message: $msg,
            location: snafu::Location::default(),
            code: $code,
        }
    };
}

/// Decodes base64url data that may arrive without padding, which is what
/// mail providers emit for bodies and attachments.
pub fn decode_base64url(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let trimmed = data.trim_end_matches('=');
    match trimmed.len() % 4 {
        0 => base64_decode_url_safe!(trimmed),
        rem => base64_decode_url_safe!(format!("{}{}", trimmed, "=".repeat(4 - rem))),
    }
}

/// Murmur3 hash of a string, masked to 53 bits so the value survives a
/// round-trip through JSON numbers in exports and log tooling.
pub fn hash(s: &str) -> u64 {
    let mut cursor = std::io::Cursor::new(s.as_bytes().to_vec());
    let hash = murmur3::murmur3_x64_128(&mut cursor, 0).unwrap();
    (hash & 0x1F_FFFF_FFFF_FFFF) as u64
}

/// Deterministic surrogate key for a message record, derived from the
/// source-system message id. The same external id always maps to the same row.
pub fn message_uid(external_id: &str) -> u64 {
    hash(external_id)
}

/// Surrogate key for an attachment record, derived from the parent's external
/// id and the provider-side attachment reference.
pub fn attachment_uid(external_id: &str, source_ref: &str) -> u64 {
    let mut buffer = Vec::with_capacity(external_id.len() + 1 + source_ref.len());
    buffer.extend_from_slice(external_id.as_bytes());
    buffer.push(b':');
    buffer.extend_from_slice(source_ref.as_bytes());
    let mut cursor = std::io::Cursor::new(buffer);
    let hash = murmur3::murmur3_x64_128(&mut cursor, 0).unwrap();
    hash as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_uid_is_deterministic() {
        let a = message_uid("<CAF=abc123@mail.example.com>");
        let b = message_uid("<CAF=abc123@mail.example.com>");
        assert_eq!(a, b);
        assert_ne!(a, message_uid("<CAF=abc124@mail.example.com>"));
    }

    #[test]
    fn decodes_base64url_with_or_without_padding() {
        assert_eq!(decode_base64url("aGVsbG8").unwrap(), b"hello");
        assert_eq!(decode_base64url("aGVsbG8=").unwrap(), b"hello");
        assert!(decode_base64url("@@@").is_err());
    }

    #[test]
    fn attachment_uid_depends_on_both_parts() {
        let a = attachment_uid("msg-1", "att-1");
        assert_ne!(a, attachment_uid("msg-1", "att-2"));
        assert_ne!(a, attachment_uid("msg-2", "att-1"));
    }
}
