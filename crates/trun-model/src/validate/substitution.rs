use std::ops::Range;

/// One `$(<prefix>.<var>)` occurrence inside a templated string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference<'a> {
    /// Byte range of the whole expression, `$(` through `)`.
    pub span: Range<usize>,
    /// Parameter name: the variable text up to its first `.`.
    pub name: &'a str,
    /// Full variable text after the prefix, e.g. `foo.bar`.
    pub variable: &'a str,
}

/// Find every `$(<prefix>.<var>)` expression in `value`, left to right.
///
/// `<var>` must match `[_a-zA-Z][_a-zA-Z0-9.-]*`; anything else is plain text.
pub fn extract_references<'a>(value: &'a str, prefix: &str) -> Vec<Reference<'a>> {
    let opener = format!("$({prefix}.");
    let mut refs = Vec::new();
    let mut from = 0;

    while let Some(found) = value[from..].find(&opener) {
        let start = from + found;
        let var_start = start + opener.len();
        match scan_variable(&value[var_start..]) {
            Some(len) if value[var_start + len..].starts_with(')') => {
                let variable = &value[var_start..var_start + len];
                let end = var_start + len + 1;
                refs.push(Reference {
                    span: start..end,
                    name: variable.split('.').next().unwrap_or(variable),
                    variable,
                });
                from = end;
            }
            _ => from = start + 1,
        }
    }
    refs
}

/// Length in bytes of the variable grammar match at the start of `s`, if any.
fn scan_variable(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let first = *bytes.first()?;
    if !(first == b'_' || first.is_ascii_alphabetic()) {
        return None;
    }
    let rest = bytes[1..]
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-'))
        .count();
    Some(1 + rest)
}

/// Returns `true` if `value` is exactly one reference and nothing else.
pub(crate) fn is_isolated(value: &str, refs: &[Reference<'_>]) -> bool {
    refs.first()
        .is_some_and(|first| first.span.start == 0 && first.span.end == value.len())
}
