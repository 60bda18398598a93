// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Short-hostname discovery for `[host:<short>]` overrides and the
//! `origin_host` column.

/// Short hostname (everything before the first dot). Falls back to
/// `localhost` when the kernel will not say.
pub fn short_hostname() -> String {
    match nix::unistd::gethostname() {
        Ok(name) => {
            let full = name.to_string_lossy();
            let short = full.split('.').next().unwrap_or_default();
            if short.is_empty() {
                "localhost".to_string()
            } else {
                short.to_string()
            }
        }
        Err(_) => "localhost".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_hostname_is_nonempty_and_unqualified() {
        let name = short_hostname();
        assert!(!name.is_empty());
        assert!(!name.contains('.'));
    }
}
