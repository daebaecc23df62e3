//! Application naming.
//!
//! The orchestrator that deploys VNF charms names each application after the
//! network service, the VNF member index and the VDU. These helpers rebuild
//! that name locally so that a primitive can be addressed to the unit the
//! orchestrator actually deployed.

use crate::error::{CoreError, Result};

/// Longest formatted prefix kept before the member suffix is appended.
pub const MAX_BASE_LEN: usize = 48;

/// Length of the base-26 member suffix.
pub const SUFFIX_LEN: usize = 2;

const SUFFIX_RADIX: u32 = 26;

/// Join `parts` with dashes and map the result onto the controller's naming
/// alphabet.
///
/// ASCII digits become letters (`0` → `a`, `9` → `j`), ASCII letters are
/// lower-cased and every other character becomes a dash. Dash runs collapse
/// to one and leading or trailing dashes are dropped, so any non-empty
/// result matches `^[a-z](-?[a-z])*$`.
pub fn format_name<S: AsRef<str>>(parts: &[S]) -> String {
    let mut name = String::new();

    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            push_mapped(&mut name, '-');
        }
        for c in part.as_ref().chars() {
            push_mapped(&mut name, c);
        }
    }

    if name.ends_with('-') {
        name.pop();
    }
    name
}

fn push_mapped(name: &mut String, c: char) {
    let mapped = match c.to_digit(10) {
        Some(digit) => char::from(b'a' + digit as u8),
        None if c.is_ascii_alphabetic() => c.to_ascii_lowercase(),
        None => '-',
    };

    if mapped == '-' && (name.is_empty() || name.ends_with('-')) {
        return;
    }
    name.push(mapped);
}

/// Base service name of a runtime unit.
///
/// Deployed unit names carry the allocated suffix and ordinal
/// (`pingpong-ns-aa/0`); everything from the last dash on is dropped. Names
/// without a dash only lose their `/N` ordinal.
pub fn service_name(unit_name: &str) -> &str {
    match unit_name.rfind('-') {
        Some(idx) => &unit_name[..idx],
        None => unit_name
            .split_once('/')
            .map_or(unit_name, |(application, _)| application),
    }
}

/// Derive the application name of a VNF member deployed alongside `unit_name`.
///
/// `member_index` must be a positive integer no larger than 676 (the range a
/// two-letter suffix can encode). It is formatted as given, so `01` and `1`
/// name different applications.
pub fn application_name(
    unit_name: &str,
    member_index: &str,
    unit_id: Option<&str>,
) -> Result<String> {
    let index = parse_member_index(member_index)?;
    let suffix = member_suffix(index)?;

    let service = service_name(unit_name);
    if format_name(&[service]).is_empty() {
        return Err(CoreError::InvalidArgument(format!(
            "unit name '{}' has no usable service name",
            unit_name
        )));
    }

    let mut name = format_name(&[service, member_index, unit_id.unwrap_or("")]);
    name.push('-');
    // format_name only emits ASCII, byte truncation is safe
    name.truncate(MAX_BASE_LEN);
    name.push_str(&suffix);

    Ok(name)
}

fn parse_member_index(member_index: &str) -> Result<u32> {
    match member_index.trim().parse::<u32>() {
        Ok(index) if index > 0 => Ok(index),
        _ => Err(CoreError::InvalidArgument(format!(
            "member index must be a positive integer, got '{}'",
            member_index
        ))),
    }
}

/// Two-letter base-26 encoding of `index - 1` (`1` → `aa`, `27` → `ba`).
fn member_suffix(index: u32) -> Result<String> {
    let ordinal = index - 1;
    if ordinal >= SUFFIX_RADIX * SUFFIX_RADIX {
        return Err(CoreError::InvalidArgument(format!(
            "member index {} does not fit a {}-letter suffix",
            index, SUFFIX_LEN
        )));
    }

    let high = char::from(b'a' + (ordinal / SUFFIX_RADIX) as u8);
    let low = char::from(b'a' + (ordinal % SUFFIX_RADIX) as u8);
    Ok([high, low].iter().collect())
}
