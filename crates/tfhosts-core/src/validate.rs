//! Checks for values that end up on an ssh command line
//!
//! Addresses, users and key paths are written into `ansible_ssh_common_args`, inside a
//! single-quoted `ProxyCommand` that a shell later runs. Each is restricted to the
//! characters its kind actually needs, so no value can close the quote or add options.

/// Check a host address (IPv4, IPv6 with optional zone, or DNS name)
///
/// # Errors
/// Returns the reason the value is rejected.
pub fn check_address(address: &str) -> Result<(), String> {
    check_word(address, "address", |c| {
        c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ':' | '[' | ']' | '%')
    })
}

/// Check a login user name
///
/// # Errors
/// Returns the reason the value is rejected.
pub fn check_user(user: &str) -> Result<(), String> {
    check_word(user, "user", |c| {
        c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')
    })
}

/// Check a private key path (`~` and `/` allowed, no spaces or quotes)
///
/// # Errors
/// Returns the reason the value is rejected.
pub fn check_key_path(path: &str) -> Result<(), String> {
    check_word(path, "key path", |c| {
        c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '/' | '~' | '+' | '@')
    })
}

fn check_word(value: &str, kind: &str, allowed: impl Fn(char) -> bool) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("empty {kind}"));
    }
    if value.starts_with('-') {
        return Err(format!("{kind} `{}` starts with `-`", value.escape_default()));
    }
    if let Some(bad) = value.chars().find(|c| !allowed(*c)) {
        return Err(format!(
            "{kind} `{}` contains disallowed character {bad:?}",
            value.escape_default()
        ));
    }
    Ok(())
}
