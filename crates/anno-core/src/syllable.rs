//! Tibetan syllable counting.
//!
//! Payment for the MV and STT projects is computed per reviewed syllable,
//! so this tokenizer is deliberately small, pure, and tested on its own.
//! Syllables are delimited by the tsheg mark (U+0F0B), spaces, and line
//! breaks. Text without any delimiter falls back to contiguous runs of
//! Tibetan codepoints, and plain non-Tibetan text falls back to a
//! whitespace word count.

/// The Tibetan syllable separator (tsheg).
pub const TSHEG: char = '\u{0F0B}';

/// Whether a character falls in the Tibetan Unicode block (U+0F00–U+0FFF).
#[must_use]
pub const fn is_tibetan(c: char) -> bool {
    matches!(c, '\u{0F00}'..='\u{0FFF}')
}

/// Count syllables in `text`.
///
/// Splits on tsheg, spaces, and newlines. If no delimiter is present but
/// the text contains Tibetan codepoints, each contiguous Tibetan run
/// counts as one syllable. Text with no Tibetan codepoints at all is
/// counted as whitespace-delimited words. Blank input counts zero.
#[must_use]
pub fn count_syllables(text: &str) -> usize {
    let text = text.trim();
    if text.is_empty() {
        return 0;
    }

    let parts: Vec<&str> = text
        .split(|c: char| c == TSHEG || c.is_whitespace())
        .filter(|p| !p.trim().is_empty())
        .collect();

    if parts.len() == 1 {
        if text.chars().any(is_tibetan) {
            // No tsheg in the text; count contiguous Tibetan runs instead.
            return tibetan_runs(text);
        }
        return text.split_whitespace().count();
    }

    parts.len()
}

/// Count contiguous runs of Tibetan codepoints in `text`.
fn tibetan_runs(text: &str) -> usize {
    let mut runs = 0;
    let mut in_run = false;
    for c in text.chars() {
        if is_tibetan(c) {
            if !in_run {
                runs += 1;
                in_run = true;
            }
        } else {
            in_run = false;
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_blank() {
        assert_eq!(count_syllables(""), 0);
        assert_eq!(count_syllables("   "), 0);
        assert_eq!(count_syllables("\n\t"), 0);
    }

    #[test]
    fn test_tsheg_separated_groups() {
        // bkra·shis·bde·legs — four tsheg-separated syllables
        assert_eq!(count_syllables("བཀྲ་ཤིས་བདེ་ལེགས"), 4);
    }

    #[test]
    fn test_trailing_tsheg_ignored() {
        assert_eq!(count_syllables("བཀྲ་ཤིས་"), 2);
    }

    #[test]
    fn test_mixed_tsheg_and_whitespace() {
        assert_eq!(count_syllables("བཀྲ་ཤིས བདེ་ལེགས"), 4);
        assert_eq!(count_syllables("བཀྲ་ཤིས\nབདེ་ལེགས"), 4);
    }

    #[test]
    fn test_ascii_word_count() {
        assert_eq!(count_syllables("a b c"), 3);
        assert_eq!(count_syllables("hello"), 1);
    }

    #[test]
    fn test_tibetan_without_tsheg_counts_runs() {
        // Two Tibetan runs separated by Latin text, no tsheg anywhere.
        assert_eq!(count_syllables("ཀ(ཁ)"), 2);
    }

    #[test]
    fn test_single_tibetan_run() {
        assert_eq!(count_syllables("བཀྲཤིས"), 1);
    }

    #[test]
    fn test_consecutive_delimiters_collapse() {
        assert_eq!(count_syllables("ཀ་་ཁ"), 2);
        assert_eq!(count_syllables("a   b"), 2);
    }
}
