//! Two-letter codes shown by the indicator

use super::backend::InputSource;

/// Layout names whose code is not simply their first two letters
const ALIASES: &[(&str, &str)] = &[
    ("Russian", "RU"),
    ("US", "EN"),
    ("ABC", "EN"),
    ("British", "EN"),
    ("Ukrainian", "UA"),
    ("German", "DE"),
    ("French", "FR"),
    ("Spanish", "ES"),
    ("Italian", "IT"),
    ("Portuguese", "PT"),
    ("Japanese", "JP"),
    ("Chinese", "CN"),
    ("Korean", "KR"),
    ("Polish", "PL"),
    ("Czech", "CZ"),
    ("Turkish", "TR"),
    ("Arabic", "AR"),
    ("Hebrew", "HE"),
];

/// Derive the indicator code for a source
///
/// Uses the last dot-separated segment of the id, mapped through the alias
/// table or cut to two uppercase characters. Ids without any segment fall
/// back to the display name.
pub fn short_code(source: &InputSource) -> String {
    match source.id.split('.').filter(|s| !s.is_empty()).last() {
        Some(segment) => ALIASES
            .iter()
            .find(|(name, _)| *name == segment)
            .map(|(_, code)| (*code).to_string())
            .unwrap_or_else(|| prefix_upper(segment)),
        None => prefix_upper(&source.name),
    }
}

fn prefix_upper(text: &str) -> String {
    text.chars().take(2).collect::<String>().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_table() {
        let source = InputSource::new("com.apple.keylayout.Russian", "Russian");
        assert_eq!(short_code(&source), "RU");

        let source = InputSource::new("com.apple.keylayout.US", "U.S.");
        assert_eq!(short_code(&source), "EN");
    }

    #[test]
    fn test_segment_prefix() {
        let source = InputSource::new("com.apple.keylayout.Swedish-Pro", "Swedish - Pro");
        assert_eq!(short_code(&source), "SW");

        let source = InputSource::new("de", "Deutsch");
        assert_eq!(short_code(&source), "DE");
    }

    #[test]
    fn test_name_fallback() {
        let source = InputSource::new("", "greek");
        assert_eq!(short_code(&source), "GR");

        let source = InputSource::new("..", "x");
        assert_eq!(short_code(&source), "X");
    }
}
