/// Make `input` safe to use as a single path component.
///
/// ASCII alphanumerics, `-`, `_` and `.` are kept. Whitespace and path
/// separators become `_`; everything else is dropped. Runs of `_` collapse
/// and leading/trailing `_`, `.`, `-` are trimmed. An empty result becomes
/// `unnamed`.
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        let mapped = if c.is_ascii_alphanumeric() || matches!(c, '-' | '.') {
            Some(c)
        } else if c == '_' || c.is_whitespace() || matches!(c, '/' | '\\') {
            Some('_')
        } else {
            None
        };
        if let Some(c) = mapped {
            if c == '_' && out.ends_with('_') {
                continue;
            }
            out.push(c);
        }
    }

    let trimmed = out.trim_matches(|c| matches!(c, '_' | '.' | '-'));
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_safe_characters() {
        assert_eq!(slugify("toon-v1.0_final.safetensors"), "toon-v1.0_final.safetensors");
    }

    #[test]
    fn maps_whitespace_and_separators() {
        assert_eq!(slugify("SD 1.5"), "SD_1.5");
        assert_eq!(slugify("a/b\\c"), "a_b_c");
        assert_eq!(slugify("a  \t b"), "a_b");
    }

    #[test]
    fn drops_unsafe_characters() {
        assert_eq!(slugify("Toon: Style (v2)!"), "Toon_Style_v2");
        assert_eq!(slugify("café"), "caf");
    }

    #[test]
    fn trims_edges() {
        assert_eq!(slugify("..hidden"), "hidden");
        assert_eq!(slugify("__x__"), "x");
        assert_eq!(slugify("../.."), "unnamed");
        assert_eq!(slugify(""), "unnamed");
        assert_eq!(slugify("日本語"), "unnamed");
    }
}
