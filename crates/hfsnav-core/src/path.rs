//! Hierarchical volume path syntax.
//!
//! Volume paths are colon-delimited: the root is the sentinel `":"`, a
//! root-level entry is `":Name"`, and each further level appends
//! `":Child"`. Everything here is pure string manipulation.

use std::cmp::Ordering;

use unicode_normalization::UnicodeNormalization;

use crate::error::{CoreError, CoreResult};

/// The root directory of every volume.
pub const ROOT: &str = ":";

/// Segment separator inside volume paths.
pub const SEPARATOR: char = ':';

/// Name used when sanitising leaves nothing behind.
pub const PLACEHOLDER_NAME: &str = "Untitled";

/// Returns `true` if `path` is the root sentinel.
pub fn is_root(path: &str) -> bool {
    path == ROOT
}

/// Appends `name` to `parent`.
///
/// ```
/// use hfsnav_core::path::join;
///
/// assert_eq!(join(":", "System Folder"), ":System Folder");
/// assert_eq!(join(":System Folder", "Finder"), ":System Folder:Finder");
/// ```
pub fn join(parent: &str, name: &str) -> String {
    if is_root(parent) {
        format!("{ROOT}{name}")
    } else {
        format!("{parent}{SEPARATOR}{name}")
    }
}

/// Strips the last segment of `path`. The parent of the root is the root.
pub fn parent_of(path: &str) -> &str {
    if is_root(path) {
        return ROOT;
    }
    match path.rfind(SEPARATOR) {
        Some(0) | None => ROOT,
        Some(idx) => &path[..idx],
    }
}

/// Returns the last segment of `path`, or an empty string for the root.
pub fn name_of(path: &str) -> &str {
    if is_root(path) {
        return "";
    }
    match path.rfind(SEPARATOR) {
        Some(idx) => &path[idx + SEPARATOR.len_utf8()..],
        None => path,
    }
}

/// Turns a host file name into a usable volume name.
///
/// The name is NFC-composed (macOS hands out decomposed names), the path
/// separator is replaced with `-`, and an empty result becomes
/// [`PLACEHOLDER_NAME`].
pub fn sanitize(host_name: &str) -> String {
    let composed: String = host_name.nfc().collect();
    let cleaned = composed.replace(SEPARATOR, "-");
    if cleaned.is_empty() {
        PLACEHOLDER_NAME.to_string()
    } else {
        cleaned
    }
}

/// Turns a volume name into a usable host file name (`/` becomes `-`).
pub fn host_name(volume_name: &str) -> String {
    let cleaned = volume_name.replace('/', "-").replace('\0', "");
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        PLACEHOLDER_NAME.to_string()
    } else {
        cleaned
    }
}

/// Returns `true` if `path` equals `ancestor` or lies below it.
pub fn is_within(path: &str, ancestor: &str) -> bool {
    if is_root(ancestor) || path == ancestor {
        return true;
    }
    is_strict_descendant(path, ancestor)
}

/// Returns `true` if `path` lies strictly below `ancestor`.
pub fn is_strict_descendant(path: &str, ancestor: &str) -> bool {
    if is_root(ancestor) {
        return !is_root(path);
    }
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path[ancestor.len()..].starts_with(SEPARATOR)
}

/// Case-insensitive name equality, the volume's notion of "same name".
pub fn names_match(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Case-insensitive ordering used for directory listings.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Validates a name typed by the user for a rename.
///
/// Returns the trimmed name.
///
/// # Errors
///
/// - [`CoreError::InvalidName`] if the name is empty after trimming or
///   contains the path separator.
pub fn validate_name(name: &str) -> CoreResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.contains(SEPARATOR) {
        return Err(CoreError::InvalidName(name.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Validates a file type or creator code: empty (unset) or exactly four
/// characters.
pub fn validate_code(code: &str) -> CoreResult<()> {
    let count = code.chars().count();
    if count == 0 || count == 4 {
        Ok(())
    } else {
        Err(CoreError::InvalidName(format!(
            "'{code}' is not a four-character code"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_on_root_has_single_separator() {
        assert_eq!(join(ROOT, "Docs"), ":Docs");
    }

    #[test]
    fn join_nested() {
        assert_eq!(join(":Docs", "Letters"), ":Docs:Letters");
    }

    #[test]
    fn parent_of_root_is_root() {
        assert_eq!(parent_of(ROOT), ROOT);
    }

    #[test]
    fn parent_of_top_level_is_root() {
        assert_eq!(parent_of(":Docs"), ROOT);
    }

    #[test]
    fn parent_of_nested() {
        assert_eq!(parent_of(":Docs:Letters:Mom"), ":Docs:Letters");
    }

    #[test]
    fn parent_of_join_roundtrips_for_many_parents() {
        for parent in [ROOT, ":a", ":a:b", ":Über Ordner:c d"] {
            for name in ["x", "Read Me", "ÄÖÜ", "a.b"] {
                let joined = join(parent, name);
                assert_eq!(parent_of(&joined), parent);
                assert_eq!(parent_of(&join(parent, name)), parent_of(&joined));
                assert_eq!(name_of(&joined), name);
            }
        }
    }

    #[test]
    fn name_of_root_is_empty() {
        assert_eq!(name_of(ROOT), "");
    }

    #[test]
    fn sanitize_replaces_separator() {
        assert_eq!(sanitize("10:30 notes"), "10-30 notes");
    }

    #[test]
    fn sanitize_empty_uses_placeholder() {
        assert_eq!(sanitize(""), PLACEHOLDER_NAME);
    }

    #[test]
    fn sanitize_composes_decomposed_names() {
        let decomposed = "Cafe\u{301}";
        assert_eq!(sanitize(decomposed), "Caf\u{e9}");
    }

    #[test]
    fn host_name_replaces_slash() {
        assert_eq!(host_name("A/B Test"), "A-B Test");
        assert_eq!(host_name(".."), PLACEHOLDER_NAME);
    }

    #[test]
    fn is_within_root_contains_everything() {
        assert!(is_within(":a:b", ROOT));
        assert!(is_within(ROOT, ROOT));
    }

    #[test]
    fn is_within_self_and_children() {
        assert!(is_within(":a", ":a"));
        assert!(is_within(":a:sub", ":a"));
        assert!(!is_within(":ab", ":a"));
        assert!(!is_within(":a", ":a:sub"));
    }

    #[test]
    fn strict_descendant_excludes_self() {
        assert!(!is_strict_descendant(":a", ":a"));
        assert!(is_strict_descendant(":a:b", ":a"));
        assert!(is_strict_descendant(":a", ROOT));
        assert!(!is_strict_descendant(ROOT, ROOT));
    }

    #[test]
    fn names_match_ignores_case() {
        assert!(names_match("ReadMe", "README"));
        assert!(!names_match("ReadMe", "ReadMe2"));
    }

    #[test]
    fn compare_names_is_case_insensitive() {
        assert_eq!(compare_names("apple", "Banana"), Ordering::Less);
        assert_eq!(compare_names("Zebra", "apple"), Ordering::Greater);
    }

    #[test]
    fn validate_name_trims() {
        assert_eq!(validate_name("  Letter  ").unwrap(), "Letter");
    }

    #[test]
    fn validate_name_rejects_empty_and_separator() {
        assert!(matches!(validate_name("   "), Err(CoreError::InvalidName(_))));
        assert!(matches!(validate_name("a:b"), Err(CoreError::InvalidName(_))));
    }

    #[test]
    fn validate_code_accepts_four_or_empty() {
        assert!(validate_code("TEXT").is_ok());
        assert!(validate_code("").is_ok());
        assert!(validate_code("TXT").is_err());
        assert!(validate_code("TEXTS").is_err());
    }
}
