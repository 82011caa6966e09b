//! Document version resolution.
//!
//! Every meta record stores the document version it was written under. Changing the
//! configured version makes every stored record stale, which forces a full reindex.

use std::hash::{Hash, Hasher};

use siphasher::sip::SipHasher24;

/// Resolves a configured version string to the numeric version stored in the index.
///
/// Numeric strings are used verbatim. Anything else maps to a stable value near
/// `i64::MAX`, so editing the string still changes the version.
pub fn resolve_document_version(version: &str) -> i64 {
    let trimmed = version.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return n;
    }
    let mut hasher = SipHasher24::new();
    trimmed.hash(&mut hasher);
    let high = (hasher.finish() >> 32) as i64;
    i64::MAX - high
}

/// The version written to meta records during a forced full rebuild.
///
/// Always an extreme value that differs from `current`, so every file mismatches.
pub fn rebuild_version(current: i64) -> i64 {
    if current == i64::MIN {
        i64::MAX
    } else {
        i64::MIN
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn numeric_versions_are_used_as_is() {
        assert_eq!(resolve_document_version("0"), 0);
        assert_eq!(resolve_document_version(" 42 "), 42);
        assert_eq!(resolve_document_version("-3"), -3);
    }

    #[test]
    fn text_versions_hash_stably() {
        let a = resolve_document_version("spring-2024");
        assert_eq!(a, resolve_document_version("spring-2024"));
        assert_ne!(a, resolve_document_version("spring-2025"));
        assert!(a > i64::from(u32::MAX));
    }

    #[test]
    fn rebuild_version_always_differs() {
        assert_eq!(rebuild_version(0), i64::MIN);
        assert_eq!(rebuild_version(i64::MAX), i64::MIN);
        assert_eq!(rebuild_version(i64::MIN), i64::MAX);
    }
}
