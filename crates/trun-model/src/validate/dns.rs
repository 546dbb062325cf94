/// Maximum length of a DNS-1123 label.
pub const DNS_LABEL_MAX_LEN: usize = 63;

/// Returns `true` if `value` is a DNS-1123 label: lowercase alphanumerics and `-`,
/// starting and ending with an alphanumeric, at most 63 characters.
pub fn is_dns1123_label(value: &str) -> bool {
    let bytes = value.as_bytes();
    let (Some(first), Some(last)) = (bytes.first(), bytes.last()) else {
        return false;
    };
    if bytes.len() > DNS_LABEL_MAX_LEN {
        return false;
    }

    let alnum = |b: &u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    alnum(first) && alnum(last) && bytes.iter().all(|b| alnum(b) || *b == b'-')
}
