use std::fmt;

use serde_json::Number;
use smol_str::SmolStr;

use crate::Result;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

impl Literal {
    pub fn into_json(self) -> serde_json::Value {
        match self {
            Literal::Null => serde_json::Value::Null,
            Literal::Bool(value) => serde_json::Value::Bool(value),
            Literal::Number(value) => serde_json::Value::Number(value),
            Literal::String(value) => serde_json::Value::String(value),
        }
    }
}

impl From<Literal> for serde_json::Value {
    fn from(literal: Literal) -> Self {
        literal.into_json()
    }
}

/// One primitive parse event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    MapStart,
    MapKey(SmolStr),
    MapEnd,
    ArrayStart,
    ArrayEnd,
    Scalar(Literal),
}

impl Event {
    pub fn tag(&self) -> EventTag {
        match self {
            Event::MapStart => EventTag::MapStart,
            Event::MapKey(_) => EventTag::MapKey,
            Event::MapEnd => EventTag::MapEnd,
            Event::ArrayStart => EventTag::ArrayStart,
            Event::ArrayEnd => EventTag::ArrayEnd,
            Event::Scalar(_) => EventTag::Scalar,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTag {
    MapStart,
    MapKey,
    MapEnd,
    ArrayStart,
    ArrayEnd,
    Scalar,
}

impl fmt::Display for EventTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventTag::MapStart => "map start",
            EventTag::MapKey => "map key",
            EventTag::MapEnd => "map end",
            EventTag::ArrayStart => "array start",
            EventTag::ArrayEnd => "array end",
            EventTag::Scalar => "scalar",
        };
        f.write_str(name)
    }
}

/// A forward-only pull source of parse events.
///
/// `Ok(None)` signals that the document is complete. Sources are only ever
/// driven by a single [`Cursor`](crate::Cursor).
pub trait EventSource {
    fn next_event(&mut self) -> Result<Option<Event>>;
}

impl<S: EventSource + ?Sized> EventSource for &mut S {
    fn next_event(&mut self) -> Result<Option<Event>> {
        (**self).next_event()
    }
}

impl<S: EventSource + ?Sized> EventSource for Box<S> {
    fn next_event(&mut self) -> Result<Option<Event>> {
        (**self).next_event()
    }
}

/// Adapts an in-memory iterator of events, mostly for synthetic documents.
#[derive(Debug, Clone)]
pub struct EventIter<I> {
    inner: I,
}

impl<I> EventIter<I>
where
    I: Iterator<Item = Event>,
{
    pub fn new(events: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            inner: events.into_iter(),
        }
    }
}

impl<I> EventSource for EventIter<I>
where
    I: Iterator<Item = Event>,
{
    fn next_event(&mut self) -> Result<Option<Event>> {
        Ok(self.inner.next())
    }
}
