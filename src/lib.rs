//! Lazy views over JSON documents too large to hold in memory.
//!
//! A document is walked once, front to back, by a single [`Cursor`]. Objects
//! and arrays come out as [`ObjectView`]s and [`ArrayView`]s that produce
//! their entries on demand; anything a caller does not read is skipped the
//! next time an enclosing view moves on. [`search`] locates every subtree
//! matching a [`Pattern`] and materializes only those.
//!
//! ```
//! use lazy_json::{Document, Value};
//!
//! let Document { mut cursor, root } =
//!     lazy_json::parse(r#"{"a": {"x": 1, "y": 2}, "b": 3}"#.as_bytes())?;
//! let Value::Object(mut object) = root else { unreachable!() };
//!
//! let (key, _ignored) = object.next(&mut cursor)?.unwrap();
//! assert_eq!(key, "a");
//! let (key, value) = object.next(&mut cursor)?.unwrap();
//! assert_eq!(key, "b");
//! assert_eq!(value.materialize(&mut cursor)?, serde_json::json!(3));
//! # Ok::<(), lazy_json::Error>(())
//! ```

pub mod cursor;
pub mod error;
pub mod event;
pub mod materialize;
pub mod options;
pub mod path;
pub mod search;
pub mod source;
pub mod view;

use std::io::Read;

use serde::de::DeserializeOwned;
use tracing::debug;

pub use crate::cursor::{ContainerKind, Cursor, CursorStats};
pub use crate::error::{Error, ErrorKind, Location};
pub use crate::event::{Event, EventIter, EventSource, EventTag, Literal};
pub use crate::materialize::{materialize, release, Materialized};
pub use crate::options::{MismatchPolicy, ReaderOptions, SearchOptions};
pub use crate::path::{parse_pattern, Matcher, Path, PathComponent, Pattern, WILDCARD};
pub use crate::search::{MatchedItem, Search};
pub use crate::source::JsonEvents;
pub use crate::view::{decode, ArrayView, Container, Entries, ObjectView, Value};

pub type Result<T> = std::result::Result<T, Error>;

/// A parsed document: the root value and the cursor every view reads through.
pub struct Document<S> {
    pub cursor: Cursor<S>,
    pub root: Value,
}

impl<S: EventSource> Document<S> {
    pub fn into_parts(self) -> (Cursor<S>, Value) {
        (self.cursor, self.root)
    }

    /// Loads the whole document eagerly.
    pub fn materialize(self) -> Result<Materialized> {
        let Document { mut cursor, root } = self;
        let value = materialize(root, &mut cursor)?;
        cursor.finish()?;
        Ok(value)
    }

    /// Skips whatever is left of the root and checks nothing follows it.
    pub fn finish(self) -> Result<CursorStats> {
        let Document { mut cursor, root } = self;
        root.skip(&mut cursor)?;
        cursor.finish()?;
        Ok(cursor.stats())
    }
}

pub fn parse<R: Read>(reader: R) -> Result<Document<JsonEvents<R>>> {
    parse_with_options(reader, &ReaderOptions::default())
}

pub fn parse_with_options<R: Read>(
    reader: R,
    options: &ReaderOptions,
) -> Result<Document<JsonEvents<R>>> {
    parse_events(JsonEvents::with_options(reader, options))
}

pub fn parse_events<S: EventSource>(source: S) -> Result<Document<S>> {
    let mut cursor = Cursor::new(source);
    let root = cursor.decode()?;
    debug!(kind = ?root.container_kind(), "decoded document root");
    Ok(Document { cursor, root })
}

pub fn parse_to_value<R: Read>(reader: R) -> Result<Materialized> {
    parse(reader)?.materialize()
}

pub fn search<R: Read>(reader: R, pattern: impl Into<Pattern>) -> Search<JsonEvents<R>> {
    search_with_options(reader, pattern, &SearchOptions::default())
}

pub fn search_with_options<R: Read>(
    reader: R,
    pattern: impl Into<Pattern>,
    options: &SearchOptions,
) -> Search<JsonEvents<R>> {
    Search::new(
        JsonEvents::with_options(reader, &options.reader),
        pattern.into(),
        options.mismatch,
    )
}

pub fn search_events<S: EventSource>(
    source: S,
    pattern: impl Into<Pattern>,
    mismatch: MismatchPolicy,
) -> Search<S> {
    Search::new(source, pattern.into(), mismatch)
}

pub fn search_as<T: DeserializeOwned, R: Read>(
    reader: R,
    pattern: impl Into<Pattern>,
) -> impl Iterator<Item = Result<T>> {
    search(reader, pattern).deserialize()
}
