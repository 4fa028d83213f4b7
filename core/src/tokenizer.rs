use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // Everything that is not a word character, whitespace or a Hangul syllable.
    static ref NON_WORD: Regex = Regex::new(r"[^\w\s\p{Hangul}]").expect("valid regex");
}

/// Normalize a raw query into search terms: NFKC, lowercase, strip symbols,
/// collapse whitespace and drop single-character tokens.
pub fn normalize_query(query: &str) -> Vec<String> {
    let folded = query.nfkc().collect::<String>().to_lowercase();
    NON_WORD
        .replace_all(&folded, " ")
        .split_whitespace()
        .filter(|t| t.chars().count() > 1)
        .map(str::to_string)
        .collect()
}

/// Terms contributed by a document body to the document-frequency index.
pub fn index_terms(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    NON_WORD
        .replace_all(&lower, " ")
        .split_whitespace()
        .filter(|t| t.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

/// Whole-word, Unicode-aware matcher for one lower-cased term.
///
/// Compiled once per query term and reused across every document scored.
#[derive(Debug, Clone)]
pub struct TermMatcher {
    term: String,
    re: Option<Regex>,
}

impl TermMatcher {
    pub fn new(term: &str) -> Self {
        let term = term.trim().to_lowercase();
        let re = if term.is_empty() {
            None
        } else {
            RegexBuilder::new(&format!(r"\b{}\b", regex::escape(&term)))
                .build()
                .ok()
        };
        Self { term, re }
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    /// Occurrences in `haystack`, which must already be lower-cased.
    pub fn count(&self, haystack: &str) -> usize {
        match &self.re {
            Some(re) => re.find_iter(haystack).count(),
            None => 0,
        }
    }
}

const LATIN_CHARS_PER_TOKEN: f64 = 4.0;
const CJK_CHARS_PER_TOKEN: f64 = 1.5;
const OTHER_CHARS_PER_TOKEN: f64 = 3.0;

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{1100}'..='\u{11FF}'     // Hangul Jamo
        | '\u{3040}'..='\u{30FF}'   // Hiragana, Katakana
        | '\u{3130}'..='\u{318F}'   // Hangul compatibility Jamo
        | '\u{3400}'..='\u{4DBF}'   // CJK extension A
        | '\u{4E00}'..='\u{9FFF}'   // CJK unified ideographs
        | '\u{AC00}'..='\u{D7AF}'   // Hangul syllables
        | '\u{F900}'..='\u{FAFF}'   // CJK compatibility ideographs
    )
}

fn is_latin(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '\u{00C0}'..='\u{024F}')
}

/// Rough LLM token count: Latin, CJK and remaining characters are divided by
/// separate chars-per-token ratios, summed and rounded up. Whitespace is free.
pub fn estimate_tokens(text: &str) -> usize {
    let (mut latin, mut cjk, mut other) = (0usize, 0usize, 0usize);
    for c in text.chars() {
        if c.is_whitespace() {
            continue;
        }
        if is_latin(c) {
            latin += 1;
        } else if is_cjk(c) {
            cjk += 1;
        } else {
            other += 1;
        }
    }
    let estimate = latin as f64 / LATIN_CHARS_PER_TOKEN
        + cjk as f64 / CJK_CHARS_PER_TOKEN
        + other as f64 / OTHER_CHARS_PER_TOKEN;
    estimate.ceil() as usize
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_symbols_and_short_tokens() {
        let t = normalize_query("  React 로그인, a JWT-token!! ");
        assert_eq!(t, vec!["react", "로그인", "jwt", "token"]);
    }

    #[test]
    fn normalize_empty() {
        assert!(normalize_query("").is_empty());
        assert!(normalize_query("?! - a").is_empty());
    }

    #[test]
    fn matcher_counts_whole_words_only() {
        let m = TermMatcher::new("Login");
        assert_eq!(m.count("login, relogin, login_page, login."), 2);
        let k = TermMatcher::new("로그인");
        assert_eq!(k.count("로그인 기능과 로그인 화면"), 2);
    }

    #[test]
    fn matcher_escapes_metacharacters() {
        let m = TermMatcher::new("next.js");
        assert_eq!(m.count("use next.js or nextxjs"), 1);
        assert_eq!(TermMatcher::new("  ").count("anything"), 0);
    }

    #[test]
    fn token_estimate_by_script() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcdefgh"), 2);
        assert_eq!(estimate_tokens("로그인"), 2);
        assert_eq!(estimate_tokens("abcd {}"), 2);
    }
}
