//! Record Validation
//!
//! Pure syntax checks applied before anything leaves the process. The AAAA
//! check is a character allow-list, not a full IPv6 parser.

use super::types::{RecordType, ValidationError, AUTO_TTL};

/// Longest label DNS allows
pub const MAX_LABEL_LEN: usize = 63;

/// Provider bounds for an explicit TTL
const MIN_TTL: u32 = 60;
const MAX_TTL: u32 = 86_400;

/// Check a subdomain label: `[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?`, at most 63 chars
pub fn validate_label(label: &str) -> Result<(), ValidationError> {
    let bytes = label.as_bytes();
    let (first, last) = match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Err(ValidationError::InvalidLabel),
    };

    let allowed = |b: u8| b.is_ascii_alphanumeric() || b == b'-';
    if !first.is_ascii_alphanumeric()
        || !last.is_ascii_alphanumeric()
        || !bytes.iter().all(|b| allowed(*b))
    {
        return Err(ValidationError::InvalidLabel);
    }

    if label.len() > MAX_LABEL_LEN {
        return Err(ValidationError::LabelTooLong);
    }

    Ok(())
}

/// Parse a requested record type, restricted to the managed set
pub fn parse_record_type(record_type: &str) -> Result<RecordType, ValidationError> {
    record_type
        .parse()
        .map_err(|_| ValidationError::UnsupportedType(record_type.to_string()))
}

/// Check content against the syntax its record type requires
pub fn validate_content(record_type: RecordType, content: &str) -> Result<(), ValidationError> {
    match record_type {
        RecordType::A => validate_ipv4(content),
        RecordType::AAAA => validate_ipv6(content),
        RecordType::CNAME => validate_cname(content),
    }
}

/// TTL is 1 (automatic) or within the provider's explicit range
pub fn validate_ttl(ttl: u32) -> Result<(), ValidationError> {
    if ttl == AUTO_TTL || (MIN_TTL..=MAX_TTL).contains(&ttl) {
        Ok(())
    } else {
        Err(ValidationError::InvalidTtl(ttl))
    }
}

fn validate_ipv4(content: &str) -> Result<(), ValidationError> {
    let groups: Vec<&str> = content.split('.').collect();
    if groups.len() != 4 {
        return Err(ValidationError::InvalidIpv4);
    }

    for group in groups {
        let digits_only = !group.is_empty() && group.bytes().all(|b| b.is_ascii_digit());
        if !digits_only || group.len() > 3 {
            return Err(ValidationError::InvalidIpv4);
        }
        match group.parse::<u16>() {
            Ok(value) if value <= 255 => {}
            _ => return Err(ValidationError::InvalidIpv4),
        }
    }

    Ok(())
}

fn validate_ipv6(content: &str) -> Result<(), ValidationError> {
    if !content.is_empty() && content.bytes().all(|b| b.is_ascii_hexdigit() || b == b':') {
        Ok(())
    } else {
        Err(ValidationError::InvalidIpv6)
    }
}

fn validate_cname(content: &str) -> Result<(), ValidationError> {
    let bytes = content.as_bytes();
    if bytes.len() < 3 {
        return Err(ValidationError::InvalidCname);
    }

    let edges_ok = bytes[0].is_ascii_alphanumeric() && bytes[bytes.len() - 1].is_ascii_alphanumeric();
    let interior_ok = bytes[1..bytes.len() - 1]
        .iter()
        .all(|b| b.is_ascii_alphanumeric() || *b == b'.' || *b == b'-');

    if edges_ok && interior_ok {
        Ok(())
    } else {
        Err(ValidationError::InvalidCname)
    }
}
