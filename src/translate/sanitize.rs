use once_cell::sync::Lazy;
use regex::Regex;

// Reasoning blocks emitted by thinking models, possibly spanning lines
static THINK_BLOCK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<think>.*?</think>").expect("think block regex is valid"));

static THINK_TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</?think>").expect("think tag regex is valid"));

const ELLIPSIS: &str = "...";

/// Turn a raw completion into the text accepted for a subtitle unit.
///
/// Markup and ellipses are removed first, then surrounding whitespace, one
/// pair of wrapping quotes, and a single boilerplate lead-in such as
/// `Translation:`. An empty result is valid.
pub fn sanitize_response(raw: &str, source_name: &str, target_name: &str) -> String {
    let stripped = strip_markup(raw);
    let unquoted = strip_wrapping_quotes(stripped.trim());
    strip_lead_in(unquoted, source_name, target_name)
        .trim()
        .to_string()
}

fn strip_markup(raw: &str) -> String {
    let mut text = raw.to_string();
    // A removal can splice a new marker together, e.g. "<thi...nk>"
    loop {
        let without_blocks = THINK_BLOCK_REGEX.replace_all(&text, "");
        let without_tags = THINK_TAG_REGEX.replace_all(&without_blocks, "");
        let next = without_tags.replace(ELLIPSIS, "");
        if next == text {
            return text;
        }
        text = next;
    }
}

fn strip_wrapping_quotes(text: &str) -> &str {
    if text.len() < 2 {
        return text;
    }
    for quote in ['"', '\''] {
        if text.starts_with(quote) && text.ends_with(quote) {
            return &text[1..text.len() - 1];
        }
    }
    text
}

fn strip_lead_in<'a>(text: &'a str, source_name: &str, target_name: &str) -> &'a str {
    let lead_ins = [
        format!("Your {} translation:", target_name),
        "Translated text:".to_string(),
        "Translation:".to_string(),
        "Here is the translation:".to_string(),
        format!("The {} translation is:", target_name),
        format!("The translation from {} to {} is:", source_name, target_name),
    ];

    lead_ins
        .iter()
        .find_map(|lead_in| strip_prefix_ignore_case(text, lead_in))
        .map_or(text, str::trim_start)
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let mut chars = text.char_indices();
    for expected in prefix.chars() {
        let (_, actual) = chars.next()?;
        if !actual.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
    }
    Some(chars.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(raw: &str) -> String {
        sanitize_response(raw, "English", "French")
    }

    #[test]
    fn test_removes_think_block_across_lines() {
        assert_eq!(clean("<think>\nlet me see\n</think>\nBonjour"), "Bonjour");
        assert_eq!(clean("<THINK>x</Think>Salut"), "Salut");
    }

    #[test]
    fn test_think_block_removal_is_not_greedy() {
        assert_eq!(clean("<think>a</think>Un<think>b</think> deux"), "Un deux");
    }

    #[test]
    fn test_removes_stray_tags_and_ellipses() {
        assert_eq!(clean("</think>Attends... quoi"), "Attends quoi");
        assert_eq!(clean("Oui<think>"), "Oui");
    }

    #[test]
    fn test_never_leaves_markup_or_ellipsis() {
        let inputs = [
            "<thi...nk>hello</think>",
            "..<think>.x",
            "<<think>think>a</think>",
            "......",
            "<think><think></think></think>",
            "text <THINK> more </THINK> end...",
        ];
        for input in inputs {
            let result = clean(input).to_lowercase();
            assert!(!result.contains("<think>"), "{:?} -> {:?}", input, result);
            assert!(!result.contains("</think>"), "{:?} -> {:?}", input, result);
            assert!(!result.contains("..."), "{:?} -> {:?}", input, result);
        }
    }

    #[test]
    fn test_strips_exactly_one_pair_of_quotes() {
        assert_eq!(clean("\"Bonjour\""), "Bonjour");
        assert_eq!(clean("'Bonjour'"), "Bonjour");
        assert_eq!(clean("\"\"Bonjour\"\""), "\"Bonjour\"");
        assert_eq!(clean("  \"Il a dit \"non\"\"  "), "Il a dit \"non\"");
    }

    #[test]
    fn test_leaves_unbalanced_or_mixed_quotes() {
        assert_eq!(clean("\"Bonjour"), "\"Bonjour");
        assert_eq!(clean("\"Bonjour'"), "\"Bonjour'");
        assert_eq!(clean("\""), "\"");
    }

    #[test]
    fn test_strips_lead_in_case_insensitively() {
        assert_eq!(clean("Your French translation: Bonjour"), "Bonjour");
        assert_eq!(clean("TRANSLATION:   Salut"), "Salut");
        assert_eq!(clean("here is the translation:\nMerci"), "Merci");
        assert_eq!(clean("The translation from English to French is: Oui"), "Oui");
    }

    #[test]
    fn test_strips_only_first_lead_in() {
        assert_eq!(clean("Translation: Translated text: Oui"), "Translated text: Oui");
    }

    #[test]
    fn test_lead_in_with_non_ascii_language_name() {
        let cleaned = sanitize_response("YOUR FRANÇAIS TRANSLATION: Oui", "English", "Français");
        assert_eq!(cleaned, "Oui");
    }

    #[test]
    fn test_quotes_removed_before_lead_in() {
        assert_eq!(clean("\"Translation: Bonjour\""), "Bonjour");
    }

    #[test]
    fn test_keeps_internal_line_breaks() {
        assert_eq!(clean("  Ligne un\nLigne deux \n"), "Ligne un\nLigne deux");
    }

    #[test]
    fn test_empty_result_is_accepted() {
        assert_eq!(clean("<think>only thoughts</think>"), "");
        assert_eq!(clean("   "), "");
    }
}
