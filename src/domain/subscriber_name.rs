use unicode_segmentation::UnicodeSegmentation;

/// Longer names are cut, not rejected
const MAX_GRAPHEMES: usize = 256;

/// The optional display name a visitor types into the `USER` field. Forwarded
/// to providers as a first name (`FNAME`, `first_name`, `name`).
///
/// Must be instantiated with `SubscriberName::parse`; the field is private to
/// prevent bypassing of `parse`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriberName(String);

impl SubscriberName {
    /// Clean up whatever was typed. Tags and control characters are dropped,
    /// whitespace runs collapse to a single space, and overlong names are
    /// cut. A name is never a reason to refuse a subscription; `None` means
    /// nothing usable was left.
    pub fn parse(name: String) -> Option<Self> {
        let text = strip_tags(&name);
        let words: Vec<&str> = text
            .split(|c: char| c.is_whitespace() || c.is_control())
            .filter(|w| !w.is_empty())
            .collect();
        let name: String = words.join(" ").graphemes(true).take(MAX_GRAPHEMES).collect();
        let name = name.trim_end();
        match name.is_empty() {
            true => None,
            false => Some(Self(name.to_string())),
        }
    }
}

/// Drop everything from a tag opener (`<` followed by a letter, `/` or `!`)
/// up to the next `>`. Other `<` are kept.
fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    let mut in_tag = false;
    while let Some(c) = chars.next() {
        match (in_tag, c) {
            (true, '>') => in_tag = false,
            (true, _) => {}
            (false, '<')
                if chars
                    .peek()
                    .is_some_and(|n| n.is_alphabetic() || matches!(n, '/' | '!')) =>
            {
                in_tag = true
            }
            (false, c) => out.push(c),
        }
    }
    out
}

impl AsRef<str> for SubscriberName {
    fn as_ref(&self) -> &str { &self.0 }
}
