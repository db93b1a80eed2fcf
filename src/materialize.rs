use std::fmt;
use std::mem;
use std::ops::Deref;

use serde_json::{Map, Value as JsonValue};
use smol_str::SmolStr;

use crate::cursor::Cursor;
use crate::event::EventSource;
use crate::view::{ArrayView, ObjectView, Value};
use crate::{Error, Result};

enum Partial {
    Object {
        view: ObjectView,
        map: Map<String, JsonValue>,
        pending: Option<SmolStr>,
    },
    Array {
        view: ArrayView,
        items: Vec<JsonValue>,
    },
}

enum Opened {
    Leaf(JsonValue),
    Node(Partial),
}

enum Step {
    Continue,
    Descend(Partial),
    Complete,
}

impl Partial {
    fn open(value: Value) -> Opened {
        match value {
            Value::Scalar(literal) => Opened::Leaf(literal.into_json()),
            Value::Object(view) => Opened::Node(Partial::Object {
                view,
                map: Map::new(),
                pending: None,
            }),
            Value::Array(view) => Opened::Node(Partial::Array {
                view,
                items: Vec::new(),
            }),
        }
    }

    fn step<S: EventSource>(&mut self, cursor: &mut Cursor<S>) -> Result<Step> {
        match self {
            Partial::Object { view, map, pending } => match view.next(cursor)? {
                Some((key, value)) => match Partial::open(value) {
                    Opened::Leaf(leaf) => {
                        map.insert(key.to_string(), leaf);
                        Ok(Step::Continue)
                    }
                    Opened::Node(node) => {
                        *pending = Some(key);
                        Ok(Step::Descend(node))
                    }
                },
                None => Ok(Step::Complete),
            },
            Partial::Array { view, items } => match view.next(cursor)? {
                Some((_, value)) => match Partial::open(value) {
                    Opened::Leaf(leaf) => {
                        items.push(leaf);
                        Ok(Step::Continue)
                    }
                    Opened::Node(node) => Ok(Step::Descend(node)),
                },
                None => Ok(Step::Complete),
            },
        }
    }

    fn attach(&mut self, child: JsonValue) -> Result<()> {
        match self {
            Partial::Object { map, pending, .. } => match pending.take() {
                Some(key) => {
                    map.insert(key.to_string(), child);
                    Ok(())
                }
                None => {
                    release(child);
                    Err(Error::structural("completed member without a pending key"))
                }
            },
            Partial::Array { items, .. } => {
                items.push(child);
                Ok(())
            }
        }
    }

    fn finish(self) -> JsonValue {
        match self {
            Partial::Object { map, .. } => JsonValue::Object(map),
            Partial::Array { items, .. } => JsonValue::Array(items),
        }
    }
}

/// A fully resolved JSON value that frees itself without recursion.
///
/// `serde_json::Value` drops its children recursively, which overflows the
/// stack on documents nested a few hundred thousand levels deep. Dropping a
/// `Materialized` tears the tree down on a heap stack instead. Call
/// [`Materialized::into_inner`] to take the plain value and its recursive
/// drop along with it.
#[derive(Clone, Default, PartialEq)]
pub struct Materialized(JsonValue);

impl Materialized {
    pub fn new(value: JsonValue) -> Self {
        Self(value)
    }

    pub fn into_inner(mut self) -> JsonValue {
        mem::take(&mut self.0)
    }
}

impl Drop for Materialized {
    fn drop(&mut self) {
        if matches!(self.0, JsonValue::Array(_) | JsonValue::Object(_)) {
            release(mem::take(&mut self.0));
        }
    }
}

impl Deref for Materialized {
    type Target = JsonValue;

    fn deref(&self) -> &JsonValue {
        &self.0
    }
}

impl From<JsonValue> for Materialized {
    fn from(value: JsonValue) -> Self {
        Self(value)
    }
}

impl PartialEq<JsonValue> for Materialized {
    fn eq(&self, other: &JsonValue) -> bool {
        self.0 == *other
    }
}

impl PartialEq<Materialized> for JsonValue {
    fn eq(&self, other: &Materialized) -> bool {
        *self == other.0
    }
}

impl fmt::Debug for Materialized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

/// Frees `value` from a heap stack, never recursing.
pub fn release(value: JsonValue) {
    let mut pending = vec![value];
    while let Some(value) = pending.pop() {
        match value {
            JsonValue::Array(items) => pending.extend(items),
            JsonValue::Object(map) => pending.extend(map.into_iter().map(|(_, child)| child)),
            _ => {}
        }
    }
}

/// Drains `value` into a fully resolved [`Materialized`] value.
///
/// Nesting is tracked on an explicit stack, so depth is bounded by memory
/// rather than by the call stack. Later duplicate keys overwrite earlier ones.
/// A view that an ancestor already skipped past reads as exhausted, so it
/// materializes as an empty object or array rather than failing.
pub fn materialize<S: EventSource>(value: Value, cursor: &mut Cursor<S>) -> Result<Materialized> {
    let mut stack = match Partial::open(value) {
        Opened::Leaf(leaf) => return Ok(Materialized(leaf)),
        Opened::Node(node) => vec![node],
    };

    let built = drain(&mut stack, cursor);
    for partial in stack.drain(..).rev() {
        release(partial.finish());
    }
    built.map(Materialized)
}

fn drain<S: EventSource>(stack: &mut Vec<Partial>, cursor: &mut Cursor<S>) -> Result<JsonValue> {
    while let Some(top) = stack.last_mut() {
        match top.step(cursor)? {
            Step::Continue => {}
            Step::Descend(node) => stack.push(node),
            Step::Complete => {
                let Some(done) = stack.pop() else {
                    break;
                };
                let finished = done.finish();
                match stack.last_mut() {
                    Some(parent) => {
                        if let Err(err) = parent.attach(finished) {
                            return Err(cursor.poison(err));
                        }
                    }
                    None => return Ok(finished),
                }
            }
        }
    }

    Err(cursor.poison(Error::structural("materialize stack emptied before completion")))
}
