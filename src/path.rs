use std::fmt;
use std::str::FromStr;

use memchr::{memchr, memchr2};
use serde::ser::{Serialize, Serializer};
use smallvec::SmallVec;
use smol_str::SmolStr;

use crate::{Error, Result};

/// One concrete step into a document: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathComponent {
    Key(SmolStr),
    Index(usize),
}

impl From<&str> for PathComponent {
    fn from(key: &str) -> Self {
        PathComponent::Key(SmolStr::new(key))
    }
}

impl From<usize> for PathComponent {
    fn from(index: usize) -> Self {
        PathComponent::Index(index)
    }
}

impl Serialize for PathComponent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            PathComponent::Key(key) => serializer.serialize_str(key),
            PathComponent::Index(index) => serializer.serialize_u64(*index as u64),
        }
    }
}

/// One step of a [`Pattern`].
///
/// # Examples
/// ```
/// use lazy_json::{Matcher, WILDCARD};
///
/// assert_eq!(Matcher::from("users"), Matcher::Key("users".into()));
/// assert_eq!(Matcher::from(3), Matcher::Index(3));
/// assert_eq!(Matcher::Wildcard, WILDCARD);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Matcher {
    Key(SmolStr),
    Index(usize),
    Wildcard,
}

/// Matches any key or index, on objects and arrays alike.
pub const WILDCARD: Matcher = Matcher::Wildcard;

impl Matcher {
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Matcher::Wildcard)
    }

    pub fn accepts(&self, component: &PathComponent) -> bool {
        match (self, component) {
            (Matcher::Wildcard, _) => true,
            (Matcher::Key(want), PathComponent::Key(got)) => want == got,
            (Matcher::Index(want), PathComponent::Index(got)) => want == got,
            _ => false,
        }
    }
}

impl From<&str> for Matcher {
    fn from(key: &str) -> Self {
        Matcher::Key(SmolStr::new(key))
    }
}

impl From<String> for Matcher {
    fn from(key: String) -> Self {
        Matcher::Key(SmolStr::from(key))
    }
}

impl From<SmolStr> for Matcher {
    fn from(key: SmolStr) -> Self {
        Matcher::Key(key)
    }
}

impl From<usize> for Matcher {
    fn from(index: usize) -> Self {
        Matcher::Index(index)
    }
}

impl From<PathComponent> for Matcher {
    fn from(component: PathComponent) -> Self {
        match component {
            PathComponent::Key(key) => Matcher::Key(key),
            PathComponent::Index(index) => Matcher::Index(index),
        }
    }
}

/// An ordered list of matchers locating subtrees of a document.
///
/// The text form joins segments with `.`: `*` is the wildcard, `[n]` an
/// index, anything else a key. Keys containing `.` (or spelled like a
/// wildcard or index) are written in double quotes with `\"` and `\\`
/// escapes.
///
/// # Examples
/// ```
/// use lazy_json::{Matcher, Pattern, WILDCARD};
///
/// let pattern: Pattern = "level-1.[0].*.\"a.b\"".parse().unwrap();
/// assert_eq!(
///     pattern.as_slice(),
///     &[
///         Matcher::from("level-1"),
///         Matcher::from(0),
///         WILDCARD,
///         Matcher::from("a.b"),
///     ]
/// );
/// assert_eq!(pattern.to_string(), "level-1.[0].*.\"a.b\"");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Pattern {
    matchers: SmallVec<[Matcher; 8]>,
}

impl Pattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, matcher: impl Into<Matcher>) {
        self.matchers.push(matcher.into());
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    pub fn get(&self, depth: usize) -> Option<&Matcher> {
        self.matchers.get(depth)
    }

    pub fn as_slice(&self) -> &[Matcher] {
        &self.matchers
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Matcher> {
        self.matchers.iter()
    }
}

impl FromIterator<Matcher> for Pattern {
    fn from_iter<I: IntoIterator<Item = Matcher>>(iter: I) -> Self {
        Self {
            matchers: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<Matcher>> for Pattern {
    fn from(matchers: Vec<Matcher>) -> Self {
        matchers.into_iter().collect()
    }
}

impl<const N: usize> From<[Matcher; N]> for Pattern {
    fn from(matchers: [Matcher; N]) -> Self {
        matchers.into_iter().collect()
    }
}

impl From<&[Matcher]> for Pattern {
    fn from(matchers: &[Matcher]) -> Self {
        matchers.iter().cloned().collect()
    }
}

impl FromStr for Pattern {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        parse_pattern(input)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, matcher) in self.matchers.iter().enumerate() {
            if idx > 0 {
                f.write_str(".")?;
            }
            match matcher {
                Matcher::Key(key) => write_key(f, key)?,
                Matcher::Index(index) => write_index(f, *index)?,
                Matcher::Wildcard => f.write_str("*")?,
            }
        }
        Ok(())
    }
}

/// Builds a [`Pattern`] from keys, indices and [`WILDCARD`].
///
/// ```
/// use lazy_json::{pattern, WILDCARD};
///
/// let pattern = pattern![WILDCARD, "s", "sessions", 0];
/// assert_eq!(pattern.to_string(), "*.s.sessions.[0]");
/// ```
#[macro_export]
macro_rules! pattern {
    ($($matcher:expr),* $(,)?) => {
        <$crate::Pattern as ::core::iter::FromIterator<$crate::Matcher>>::from_iter([
            $($crate::Matcher::from($matcher)),*
        ])
    };
}

/// The concrete keys and indices leading to a matched subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    components: SmallVec<[PathComponent; 8]>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn as_slice(&self) -> &[PathComponent] {
        &self.components
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathComponent> {
        self.components.iter()
    }

    pub fn push(&mut self, component: PathComponent) {
        self.components.push(component);
    }

    pub fn pop(&mut self) -> Option<PathComponent> {
        self.components.pop()
    }

    /// This path as a literal pattern that selects exactly it.
    pub fn to_pattern(&self) -> Pattern {
        self.components.iter().cloned().map(Matcher::from).collect()
    }
}

impl FromIterator<PathComponent> for Path {
    fn from_iter<I: IntoIterator<Item = PathComponent>>(iter: I) -> Self {
        Self {
            components: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, component) in self.components.iter().enumerate() {
            if idx > 0 {
                f.write_str(".")?;
            }
            match component {
                PathComponent::Key(key) => write_key(f, key)?,
                PathComponent::Index(index) => write_index(f, *index)?,
            }
        }
        Ok(())
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.components.iter())
    }
}

fn write_index(f: &mut fmt::Formatter<'_>, index: usize) -> fmt::Result {
    let mut buffer = itoa::Buffer::new();
    f.write_str("[")?;
    f.write_str(buffer.format(index))?;
    f.write_str("]")
}

fn write_key(f: &mut fmt::Formatter<'_>, key: &str) -> fmt::Result {
    if !needs_quotes(key) {
        return f.write_str(key);
    }
    f.write_str("\"")?;
    for ch in key.chars() {
        if ch == '"' || ch == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{ch}")?;
    }
    f.write_str("\"")
}

fn needs_quotes(key: &str) -> bool {
    key.is_empty()
        || key == "*"
        || key.starts_with('[')
        || key.starts_with('"')
        || memchr(b'.', key.as_bytes()).is_some()
}

pub fn parse_pattern(input: &str) -> Result<Pattern> {
    let bytes = input.as_bytes();
    let mut pattern = Pattern::new();
    if bytes.is_empty() {
        return Ok(pattern);
    }

    let mut pos = 0;
    loop {
        let (matcher, end) = if bytes[pos] == b'"' {
            parse_quoted_key(input, pos)?
        } else {
            let end = memchr(b'.', &bytes[pos..]).map_or(bytes.len(), |offset| pos + offset);
            (parse_bare_segment(&input[pos..end], pos)?, end)
        };
        pattern.push(matcher);

        if end == bytes.len() {
            return Ok(pattern);
        }
        if bytes[end] != b'.' {
            return Err(Error::invalid_pattern(format!(
                "expected '.' after quoted key at byte {end}"
            )));
        }
        pos = end + 1;
        if pos == bytes.len() {
            return Err(Error::invalid_pattern("pattern ends with '.'"));
        }
    }
}

fn parse_bare_segment(segment: &str, offset: usize) -> Result<Matcher> {
    if segment.is_empty() {
        return Err(Error::invalid_pattern(format!(
            "empty segment at byte {offset}"
        )));
    }
    if segment == "*" {
        return Ok(Matcher::Wildcard);
    }
    if let Some(inner) = segment.strip_prefix('[') {
        let digits = inner.strip_suffix(']').ok_or_else(|| {
            Error::invalid_pattern(format!("unclosed index at byte {offset}"))
        })?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::invalid_pattern(format!(
                "index '{digits}' at byte {offset} is not a non-negative integer"
            )));
        }
        let index = digits.parse::<usize>().map_err(|err| {
            Error::invalid_pattern(format!("index '{digits}' at byte {offset}: {err}"))
        })?;
        return Ok(Matcher::Index(index));
    }
    Ok(Matcher::Key(SmolStr::new(segment)))
}

fn parse_quoted_key(input: &str, start: usize) -> Result<(Matcher, usize)> {
    let bytes = input.as_bytes();
    let mut key = String::new();
    let mut idx = start + 1;
    loop {
        let Some(offset) = memchr2(b'\\', b'"', &bytes[idx..]) else {
            return Err(Error::invalid_pattern(format!(
                "unterminated quoted key at byte {start}"
            )));
        };
        key.push_str(&input[idx..idx + offset]);
        idx += offset;
        if bytes[idx] == b'"' {
            return Ok((Matcher::Key(SmolStr::from(key)), idx + 1));
        }
        match bytes.get(idx + 1) {
            Some(b'"') => key.push('"'),
            Some(b'\\') => key.push('\\'),
            _ => {
                return Err(Error::invalid_pattern(format!(
                    "invalid escape in quoted key at byte {idx}"
                )))
            }
        }
        idx += 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[rstest::rstest]
    fn test_parse_dotted_pattern() {
        let pattern = parse_pattern("level-1.[0].*.[0].level-3a.*.b").unwrap();
        assert_eq!(
            pattern.as_slice(),
            &[
                Matcher::from("level-1"),
                Matcher::from(0),
                WILDCARD,
                Matcher::from(0),
                Matcher::from("level-3a"),
                WILDCARD,
                Matcher::from("b"),
            ]
        );
        let wildcards: Vec<usize> = (0..pattern.len())
            .filter(|&idx| pattern.get(idx).is_some_and(Matcher::is_wildcard))
            .collect();
        assert_eq!(wildcards, vec![2, 5]);
    }

    #[rstest::rstest]
    fn test_empty_pattern() {
        assert!(parse_pattern("").unwrap().is_empty());
    }

    #[rstest::rstest]
    fn test_quoted_keys() {
        let pattern = parse_pattern(r#""*"."a\"b"."x\\y".[12]"#).unwrap();
        assert_eq!(
            pattern.as_slice(),
            &[
                Matcher::from("*"),
                Matcher::from("a\"b"),
                Matcher::from("x\\y"),
                Matcher::from(12),
            ]
        );
        assert_eq!(pattern.to_string(), r#""*".a"b.x\y.[12]"#);
    }

    #[rstest::rstest]
    #[case("a..b")]
    #[case(".a")]
    #[case("a.")]
    #[case("a.[x]")]
    #[case("a.[-1]")]
    #[case("a.[3")]
    #[case("\"open")]
    #[case("\"a\"b")]
    #[case("\"bad\\n\"")]
    fn test_invalid_patterns(#[case] input: &str) {
        let err = parse_pattern(input).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidPattern);
    }

    #[rstest::rstest]
    fn test_display_round_trips_through_parser() {
        let pattern = pattern!["users", WILDCARD, "a.b", 7, "", "[x]"];
        let text = pattern.to_string();
        assert_eq!(text, r#"users.*."a.b".[7].""."[x]""#);
        assert_eq!(parse_pattern(&text).unwrap(), pattern);
    }

    #[rstest::rstest]
    fn test_matcher_accepts() {
        assert!(WILDCARD.accepts(&PathComponent::from("x")));
        assert!(WILDCARD.accepts(&PathComponent::from(4)));
        assert!(Matcher::from("x").accepts(&PathComponent::from("x")));
        assert!(!Matcher::from("x").accepts(&PathComponent::from("y")));
        assert!(!Matcher::from(0).accepts(&PathComponent::from("0")));
    }

    #[rstest::rstest]
    fn test_path_display_and_serialize() {
        let path: Path = [
            PathComponent::from("moose"),
            PathComponent::from(0),
            PathComponent::from("goose"),
        ]
        .into_iter()
        .collect();
        assert_eq!(path.to_string(), "moose.[0].goose");
        assert_eq!(
            serde_json::to_value(&path).unwrap(),
            serde_json::json!(["moose", 0, "goose"])
        );
        assert_eq!(path.to_pattern(), pattern!["moose", 0, "goose"]);
    }
}
