//! Natural-order sort keys for mixed numeric/CJK labels.
//!
//! Period labels ("第3周", "Week 10") and grade/class names ("九年级2班",
//! "高一年级1班") must sort in human order, not lexicographic order. A label
//! is turned into a sequence of alternating text/number tokens: grade words
//! are first rewritten to zero-padded numbers, then the label is split on
//! maximal digit runs. Two labels built by the same rule always align
//! position-by-position, so the derived `Ord` on the token sequence is the
//! comparator.

use regex::Regex;
use std::sync::OnceLock;

/// One token of a [`NaturalKey`]. Variant order makes `Ord` total; aligned
/// positions hold the same variant by construction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Token {
    Num(u64),
    Text(String),
}

/// Sortable key for a label; compare with the derived lexicographic `Ord`.
pub type NaturalKey = Vec<Token>;

/// Grade-word rewrites applied before splitting. Junior grades 7/8/9 and
/// senior years 1/2/3 map onto one zero-padded scale so 九年级 sorts before
/// 高一年级. Multi-character keys come first so 高一 is never split by a
/// bare-character rewrite.
const GRADE_SUBS: [(&str, &str); 6] = [
    ("高一", "10"),
    ("高二", "11"),
    ("高三", "12"),
    ("七", "07"),
    ("八", "08"),
    ("九", "09"),
];

fn digit_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("digit-run regex"))
}

/// Build the natural-order key for a label.
///
/// Equal labels always yield equal keys; distinct periods and grade/class
/// names observed in one dataset order element-wise. Digit runs become
/// `Token::Num`, everything between them becomes a lower-cased `Token::Text`
/// (possibly empty, so token positions stay aligned across labels).
pub fn natural_key(label: &str) -> NaturalKey {
    let mut s = label.to_string();
    for (word, digits) in GRADE_SUBS {
        if s.contains(word) {
            s = s.replace(word, digits);
        }
    }

    let mut key = Vec::new();
    let mut last = 0;
    for m in digit_runs().find_iter(&s) {
        key.push(Token::Text(s[last..m.start()].to_lowercase()));
        match m.as_str().parse::<u64>() {
            Ok(n) => key.push(Token::Num(n)),
            // A digit run too long for u64 stays textual; both labels of a
            // comparison split identically, so alignment is preserved.
            Err(_) => key.push(Token::Text(m.as_str().to_string())),
        }
        last = m.end();
    }
    key.push(Token::Text(s[last..].to_lowercase()));
    key
}
