/// Member identifier preparation for audience uploads.
///
/// The platform never receives raw contact data: emails and phone numbers
/// are normalized and SHA-256 hashed client-side, then uploaded in chunks
/// of at most 10,000 entries per request.
use crate::errors::ApiError;
use phonenumber::country::Id as CountryId;
use phonenumber::Mode;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Hard platform limit on entries per `<audience>/users` request.
pub const UPLOAD_CHUNK_SIZE: usize = 10_000;

/// Kinds of member identifiers an audience accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Email,
    Phone,
    /// Mobile advertiser id (IDFA / AAID). Uploaded unhashed.
    MobileAdvertiserId,
}

impl IdentifierKind {
    /// Upload schema name the platform expects in the payload.
    pub fn schema(&self) -> &'static str {
        match self {
            IdentifierKind::Email => "EMAIL_SHA256",
            IdentifierKind::Phone => "PHONE_SHA256",
            IdentifierKind::MobileAdvertiserId => "MOBILE_ADVERTISER_ID",
        }
    }
}

/// Validate email address format.
///
/// Checks minimum length, the presence of `@` and `.`, and a simplified
/// RFC 5322 structure.
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 5 || !email.contains('@') || !email.contains('.') {
        return false;
    }

    // RFC 5322 simplified email regex
    // Matches: local@domain.tld
    let email_regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();

    email_regex.is_match(email)
}

/// Normalize an email for hashing: trimmed, lowercased, format-checked.
pub fn normalize_email(raw: &str) -> Result<String, ApiError> {
    let normalized = raw.trim().to_lowercase();
    if !is_valid_email(&normalized) {
        return Err(ApiError::BadRequest(format!(
            "Invalid email address: '{}'",
            raw.trim()
        )));
    }
    Ok(normalized)
}

/// Normalize a phone number for hashing.
///
/// Uses the phonenumber library (port of Google's libphonenumber) to parse
/// with the given default region, require a valid number, and format to
/// E.164. The platform hashes digits only, so the leading `+` is stripped:
/// `(202) 555-0123` with region US becomes `12025550123`.
pub fn normalize_phone(raw: &str, region: CountryId) -> Result<String, ApiError> {
    if raw.trim().is_empty() || raw.len() < 8 {
        return Err(ApiError::BadRequest(format!(
            "Phone number too short: '{}'",
            raw.trim()
        )));
    }

    let number = phonenumber::parse(Some(region), raw).map_err(|e| {
        ApiError::BadRequest(format!("Unparseable phone number '{}': {}", raw.trim(), e))
    })?;

    if !phonenumber::is_valid(&number) {
        return Err(ApiError::BadRequest(format!(
            "Invalid phone number: '{}'",
            raw.trim()
        )));
    }

    let formatted = number.format().mode(Mode::E164).to_string();
    Ok(formatted.trim_start_matches('+').to_string())
}

/// Normalize a mobile advertiser id: trimmed, lowercased, shape-checked.
pub fn normalize_advertiser_id(raw: &str) -> Result<String, ApiError> {
    let normalized = raw.trim().to_lowercase();
    if normalized.is_empty()
        || !normalized
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(ApiError::BadRequest(format!(
            "Invalid mobile advertiser id: '{}'",
            raw.trim()
        )));
    }
    Ok(normalized)
}

fn is_sha256_hex(value: &str) -> bool {
    value.len() == 64 && value.chars().all(|c| c.is_ascii_hexdigit())
}

/// SHA-256 an already-normalized identifier, as lowercase hex.
///
/// Values that are already 64 hex characters are treated as pre-hashed and
/// passed through (lowercased), so callers may mix raw and hashed input.
pub fn hash_identifier(normalized: &str) -> String {
    if is_sha256_hex(normalized) {
        return normalized.to_lowercase();
    }

    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

/// Normalize and hash a batch of raw identifiers.
///
/// Entries that fail normalization are skipped with a warning rather than
/// poisoning the whole batch. Returns the prepared entries in input order
/// plus the number skipped.
pub fn prepare_batch(
    kind: IdentifierKind,
    raw_values: &[String],
    phone_region: CountryId,
) -> (Vec<String>, usize) {
    let mut prepared = Vec::with_capacity(raw_values.len());
    let mut skipped = 0usize;

    for raw in raw_values {
        // Pre-hashed entries bypass kind-specific normalization
        if is_sha256_hex(raw.trim()) {
            prepared.push(raw.trim().to_lowercase());
            continue;
        }

        let normalized = match kind {
            IdentifierKind::Email => normalize_email(raw),
            IdentifierKind::Phone => normalize_phone(raw, phone_region),
            IdentifierKind::MobileAdvertiserId => normalize_advertiser_id(raw),
        };

        match normalized {
            Ok(value) => match kind {
                // Advertiser ids are uploaded as-is
                IdentifierKind::MobileAdvertiserId => prepared.push(value),
                _ => prepared.push(hash_identifier(&value)),
            },
            Err(e) => {
                tracing::warn!("Skipping identifier: {}", e);
                skipped += 1;
            }
        }
    }

    (prepared, skipped)
}

/// Split prepared entries into upload-sized chunks, preserving order.
pub fn chunk_entries(entries: &[String]) -> Vec<&[String]> {
    entries.chunks(UPLOAD_CHUNK_SIZE).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_normalization() {
        assert_eq!(
            normalize_email("  Test@Example.COM  ").unwrap(),
            "test@example.com"
        );
        assert!(normalize_email("not_an_email").is_err());
        assert!(normalize_email("missing@domain").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("user@").is_err());
    }

    #[test]
    fn test_phone_normalization_us() {
        assert_eq!(
            normalize_phone("(202) 555-0123", CountryId::US).unwrap(),
            "12025550123"
        );
        assert_eq!(
            normalize_phone("+1 202-555-0123", CountryId::US).unwrap(),
            "12025550123"
        );
        assert!(normalize_phone("123", CountryId::US).is_err());
        assert!(normalize_phone("", CountryId::US).is_err());
    }

    #[test]
    fn test_phone_normalization_br() {
        assert_eq!(
            normalize_phone("(11) 98765-4321", CountryId::BR).unwrap(),
            "5511987654321"
        );
    }

    #[test]
    fn test_hash_identifier_known_vector() {
        assert_eq!(
            hash_identifier("test@example.com"),
            "973dfe463ec85785f5f95af5ba3906eedb2d931c24e69824a89ea65dba4e813b"
        );
    }

    #[test]
    fn test_hash_identifier_passes_through_prehashed() {
        let hashed = "973dfe463ec85785f5f95af5ba3906eedb2d931c24e69824a89ea65dba4e813b";
        assert_eq!(hash_identifier(hashed), hashed);

        let uppercase = hashed.to_uppercase();
        assert_eq!(hash_identifier(&uppercase), hashed);
    }

    #[test]
    fn test_prepare_batch_skips_invalid() {
        let raw = vec![
            "joao@example.com".to_string(),
            "not_an_email".to_string(),
            " MARIA@EXAMPLE.COM ".to_string(),
        ];

        let (prepared, skipped) = prepare_batch(IdentifierKind::Email, &raw, CountryId::US);

        assert_eq!(skipped, 1);
        assert_eq!(
            prepared,
            vec![
                "a72badd7bb3fa438d2cb290471dae4ae9c80da96351cc328787468946ade2a88".to_string(),
                "10ef04a5a1acd81d18a0c61fdd354a063da07223720a1d8760aa5c2afa5e8ee0".to_string(),
            ]
        );
    }

    #[test]
    fn test_prepare_batch_accepts_prehashed_phone_entries() {
        let hashed = "980239b79aee5c456445907b92af495ac97767f6d9ac081ad3a564344ae7fb9a";
        let raw = vec![hashed.to_string(), "(202) 555-0123".to_string()];

        let (prepared, skipped) = prepare_batch(IdentifierKind::Phone, &raw, CountryId::US);

        assert_eq!(skipped, 0);
        // Raw phone hashes to the same digest as the pre-hashed entry
        assert_eq!(prepared, vec![hashed.to_string(), hashed.to_string()]);
    }

    #[test]
    fn test_advertiser_id_normalization() {
        assert_eq!(
            normalize_advertiser_id(" AEBE52E7-03EE-455A-B3C4-E57283966239 ").unwrap(),
            "aebe52e7-03ee-455a-b3c4-e57283966239"
        );
        assert!(normalize_advertiser_id("").is_err());
        assert!(normalize_advertiser_id("has spaces inside").is_err());
    }

    #[test]
    fn test_chunk_entries_bounds() {
        let entries: Vec<String> = (0..25_000).map(|i| i.to_string()).collect();
        let chunks = chunk_entries(&entries);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), UPLOAD_CHUNK_SIZE);
        assert_eq!(chunks[1].len(), UPLOAD_CHUNK_SIZE);
        assert_eq!(chunks[2].len(), 5_000);
        assert_eq!(chunks[0][0], "0");
        assert_eq!(chunks[2][4_999], "24999");
    }

    #[test]
    fn test_chunk_entries_empty() {
        assert!(chunk_entries(&[]).is_empty());
    }
}
