use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::cursor::{ContainerKind, Cursor};
use crate::event::EventSource;
use crate::materialize::{materialize, Materialized};
use crate::path::{Matcher, Path, PathComponent, Pattern};
use crate::view::{ArrayView, ObjectView, Value};
use crate::{Error, MismatchPolicy, Result};

/// A fully materialized subtree found by [`Search`], with the concrete path
/// that led to it.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedItem {
    pub path: Path,
    pub value: Materialized,
}

impl MatchedItem {
    pub fn into_value(self) -> JsonValue {
        self.value.into_inner()
    }

    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T> {
        let MatchedItem { path, value } = self;
        <T as Deserialize<'_>>::deserialize(&*value)
            .map_err(|err| Error::deserialize(format!("match at '{path}': {err}")))
    }
}

enum Walk {
    Object(ObjectView),
    Array(ArrayView),
}

impl Walk {
    fn kind(&self) -> ContainerKind {
        match self {
            Walk::Object(_) => ContainerKind::Object,
            Walk::Array(_) => ContainerKind::Array,
        }
    }

    fn next<S: EventSource>(
        &mut self,
        cursor: &mut Cursor<S>,
    ) -> Result<Option<(PathComponent, Value)>> {
        match self {
            Walk::Object(view) => Ok(view
                .next(cursor)?
                .map(|(key, value)| (PathComponent::Key(key), value))),
            Walk::Array(view) => Ok(view
                .next(cursor)?
                .map(|(index, value)| (PathComponent::Index(index), value))),
        }
    }

    fn skip<S: EventSource>(&mut self, cursor: &mut Cursor<S>) -> Result<()> {
        match self {
            Walk::Object(view) => view.skip(cursor),
            Walk::Array(view) => view.skip(cursor),
        }
    }
}

struct SearchFrame {
    walk: Walk,
    // set once a literal index matched; nothing later in the array can match
    drained_after_current: bool,
}

enum Verdict {
    Proceed,
    Reject,
    Mismatch,
}

fn judge(matcher: &Matcher, component: &PathComponent) -> Verdict {
    if matcher.is_wildcard() {
        return Verdict::Proceed;
    }
    match (matcher, component) {
        (Matcher::Key(_), PathComponent::Index(_)) | (Matcher::Index(_), PathComponent::Key(_)) => {
            Verdict::Mismatch
        }
        _ if matcher.accepts(component) => Verdict::Proceed,
        _ => Verdict::Reject,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchState {
    Start,
    Walking,
    Done,
}

/// Single-pass search for every subtree matching a [`Pattern`].
///
/// Only matched subtrees are materialized; every other branch is drained at
/// stream speed. Matches come out in document order. After the first error
/// the search yields nothing further.
pub struct Search<S> {
    cursor: Cursor<S>,
    pattern: Pattern,
    mismatch: MismatchPolicy,
    frames: Vec<SearchFrame>,
    path: Path,
    state: SearchState,
}

impl<S: EventSource> Search<S> {
    pub fn new(source: S, pattern: Pattern, mismatch: MismatchPolicy) -> Self {
        Self {
            cursor: Cursor::new(source),
            pattern,
            mismatch,
            frames: Vec::new(),
            path: Path::new(),
            state: SearchState::Start,
        }
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn cursor(&self) -> &Cursor<S> {
        &self.cursor
    }

    pub fn next_match(&mut self) -> Result<Option<MatchedItem>> {
        match self.advance() {
            Ok(Some(item)) => Ok(Some(item)),
            Ok(None) => {
                self.state = SearchState::Done;
                Ok(None)
            }
            Err(err) => {
                self.state = SearchState::Done;
                self.frames.clear();
                Err(err)
            }
        }
    }

    /// Matched values without their paths.
    pub fn values(self) -> impl Iterator<Item = Result<Materialized>> {
        self.map(|item| item.map(|item| item.value))
    }

    /// Matched values deserialized into `T`.
    pub fn deserialize<T: DeserializeOwned>(self) -> impl Iterator<Item = Result<T>> {
        self.map(|item| item.and_then(MatchedItem::deserialize))
    }

    fn advance(&mut self) -> Result<Option<MatchedItem>> {
        match self.state {
            SearchState::Done => return Ok(None),
            SearchState::Start => {
                self.state = SearchState::Walking;
                if let Some(item) = self.enter_root()? {
                    return Ok(Some(item));
                }
            }
            SearchState::Walking => {}
        }

        let Search {
            cursor,
            pattern,
            mismatch,
            frames,
            path,
            ..
        } = self;

        loop {
            let open = frames.len();
            let Some(frame) = frames.last_mut() else {
                cursor.finish()?;
                return Ok(None);
            };
            let depth = open - 1;

            if frame.drained_after_current {
                frame.walk.skip(cursor)?;
                pop_frame(frames, path);
                continue;
            }

            let Some((component, value)) = frame.walk.next(cursor)? else {
                pop_frame(frames, path);
                continue;
            };

            let Some(matcher) = pattern.get(depth) else {
                return Err(cursor.poison(Error::structural(format!(
                    "search descended to depth {depth} past a pattern of length {}",
                    pattern.len()
                ))));
            };

            match judge(matcher, &component) {
                Verdict::Proceed => {}
                Verdict::Reject => {
                    value.skip(cursor)?;
                    continue;
                }
                Verdict::Mismatch => match mismatch {
                    MismatchPolicy::Skip => {
                        value.skip(cursor)?;
                        continue;
                    }
                    MismatchPolicy::Error => {
                        let kind = frame.walk.kind();
                        let at = if path.is_empty() {
                            "the root".to_string()
                        } else {
                            format!("'{path}'")
                        };
                        return Err(cursor.poison(Error::path_type_mismatch(format!(
                            "matcher {} at depth {depth} cannot select from the {kind} at {at}",
                            Pattern::from_iter([matcher.clone()])
                        ))));
                    }
                },
            }

            if matches!(matcher, Matcher::Index(_)) {
                frame.drained_after_current = true;
            }

            if depth + 1 == pattern.len() {
                let value = materialize(value, cursor)?;
                let mut found = path.clone();
                found.push(component);
                debug!(path = %found, "path matched");
                return Ok(Some(MatchedItem { path: found, value }));
            }

            let walk = match value {
                Value::Object(view) => Walk::Object(view),
                Value::Array(view) => Walk::Array(view),
                Value::Scalar(_) => continue,
            };
            path.push(component);
            frames.push(SearchFrame {
                walk,
                drained_after_current: false,
            });
        }
    }

    fn enter_root(&mut self) -> Result<Option<MatchedItem>> {
        let root = self.cursor.decode()?;
        if self.pattern.is_empty() {
            let value = materialize(root, &mut self.cursor)?;
            self.cursor.finish()?;
            self.state = SearchState::Done;
            debug!("empty pattern matched the document root");
            return Ok(Some(MatchedItem {
                path: Path::new(),
                value,
            }));
        }
        let walk = match root {
            Value::Object(view) => Walk::Object(view),
            Value::Array(view) => Walk::Array(view),
            Value::Scalar(_) => return Ok(None),
        };
        self.frames.push(SearchFrame {
            walk,
            drained_after_current: false,
        });
        Ok(None)
    }
}

fn pop_frame(frames: &mut Vec<SearchFrame>, path: &mut Path) {
    frames.pop();
    if !frames.is_empty() {
        path.pop();
    }
}

impl<S: EventSource> Iterator for Search<S> {
    type Item = Result<MatchedItem>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_match().transpose()
    }
}
