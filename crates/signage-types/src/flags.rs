/// Boolean-like cells are stored as text. The display side accepts a strict set;
/// the admin side also accepts the short/Portuguese forms users type by hand.
const STRICT_TRUTHY: &[&str] = &["true", "1", "yes"];
const LENIENT_TRUTHY: &[&str] = &["true", "1", "yes", "y", "sim"];

/// Strict truthy check used for `active` filtering on the display.
pub fn is_truthy(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    STRICT_TRUTHY.contains(&v.as_str())
}

/// Lenient truthy check used when normalising admin edits and permissions.
pub fn is_truthy_lenient(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    LENIENT_TRUTHY.contains(&v.as_str())
}

/// Canonical on-the-wire form of a flag.
pub fn format_flag(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_set_is_case_insensitive() {
        for v in ["true", "True", "TRUE", "1", "yes", "Yes", " true "] {
            assert!(is_truthy(v), "{v:?} should be truthy");
        }
        for v in ["", "false", "0", "no", "y", "sim", "on"] {
            assert!(!is_truthy(v), "{v:?} should not be truthy");
        }
    }

    #[test]
    fn lenient_set_accepts_short_forms() {
        assert!(is_truthy_lenient("Y"));
        assert!(is_truthy_lenient("Sim"));
        assert!(!is_truthy_lenient("nao"));
    }

    #[test]
    fn canonical_form() {
        assert_eq!(format_flag(true), "true");
        assert_eq!(format_flag(false), "false");
        assert!(is_truthy(format_flag(true)));
        assert!(!is_truthy(format_flag(false)));
    }
}
