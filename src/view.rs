use smol_str::SmolStr;

use crate::cursor::{ContainerId, ContainerKind, Cursor};
use crate::event::{Event, EventSource, EventTag, Literal};
use crate::materialize::{self, Materialized};
use crate::{Error, Result};

/// A decoded position in the document: either a resolved scalar or a lazy
/// view over a container.
///
/// Views stay valid until the cursor moves past their subtree, either because
/// they were drained, explicitly skipped, or because an enclosing view resumed.
/// A view whose subtree has already been passed yields nothing.
#[derive(Debug)]
pub enum Value {
    Scalar(Literal),
    Object(ObjectView),
    Array(ArrayView),
}

impl Value {
    pub fn container_kind(&self) -> Option<ContainerKind> {
        match self {
            Value::Scalar(_) => None,
            Value::Object(_) => Some(ContainerKind::Object),
            Value::Array(_) => Some(ContainerKind::Array),
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Value::Scalar(_))
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Value::Scalar(literal) => Some(literal),
            _ => None,
        }
    }

    pub fn into_object(self) -> Option<ObjectView> {
        match self {
            Value::Object(view) => Some(view),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<ArrayView> {
        match self {
            Value::Array(view) => Some(view),
            _ => None,
        }
    }

    /// Drains the rest of this value's subtree without decoding its scalars.
    pub fn skip<S: EventSource>(self, cursor: &mut Cursor<S>) -> Result<()> {
        match self {
            Value::Scalar(_) => Ok(()),
            Value::Object(mut view) => view.skip(cursor),
            Value::Array(mut view) => view.skip(cursor),
        }
    }

    /// Loads the rest of this value eagerly.
    ///
    /// A view whose subtree the cursor has already passed materializes as an
    /// empty object or array, indistinguishable from a real empty container.
    pub fn materialize<S: EventSource>(self, cursor: &mut Cursor<S>) -> Result<Materialized> {
        materialize::materialize(self, cursor)
    }
}

impl From<Literal> for Value {
    fn from(literal: Literal) -> Self {
        Value::Scalar(literal)
    }
}

pub fn decode<S: EventSource>(cursor: &mut Cursor<S>) -> Result<Value> {
    match cursor.peek_tag()? {
        Some(EventTag::MapStart) => {
            cursor.take()?;
            let generator = ContainerGenerator::opened(cursor, ContainerKind::Object)?;
            Ok(Value::Object(ObjectView { generator }))
        }
        Some(EventTag::ArrayStart) => {
            cursor.take()?;
            let generator = ContainerGenerator::opened(cursor, ContainerKind::Array)?;
            Ok(Value::Array(ArrayView { generator }))
        }
        Some(EventTag::Scalar) => match cursor.take()? {
            Event::Scalar(literal) => {
                cursor.note_scalar_decoded();
                Ok(Value::Scalar(literal))
            }
            other => Err(cursor.poison(Error::structural(format!(
                "peeked a scalar but took {}",
                other.tag()
            )))),
        },
        Some(tag) => Err(cursor.poison(Error::structural(format!(
            "unexpected {tag} where a value was expected"
        )))),
        None => Err(cursor.poison(Error::unexpected_end(
            "event source ended where a value was expected",
        ))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GeneratorState {
    Pending,
    ItemReady,
    ChildActive,
    Exhausted,
}

#[derive(Debug)]
struct ContainerGenerator {
    id: ContainerId,
    depth: usize,
    kind: ContainerKind,
    state: GeneratorState,
    next_index: usize,
}

impl ContainerGenerator {
    fn opened<S: EventSource>(cursor: &mut Cursor<S>, kind: ContainerKind) -> Result<Self> {
        let depth = cursor.depth().checked_sub(1);
        match depth.and_then(|depth| cursor.frame(depth).map(|frame| (depth, frame))) {
            Some((depth, frame)) if frame.kind == kind => Ok(Self {
                id: frame.id,
                depth,
                kind,
                state: GeneratorState::Pending,
                next_index: 0,
            }),
            _ => Err(cursor.poison(Error::structural(format!(
                "no open {kind} after its start event"
            )))),
        }
    }

    fn is_live<S: EventSource>(&self, cursor: &Cursor<S>) -> bool {
        cursor
            .frame(self.depth)
            .is_some_and(|frame| frame.id == self.id)
    }

    /// Brings the cursor back to this container's level and peeks at what
    /// comes next. `None` means the container is exhausted or was passed.
    fn resume<S: EventSource>(&mut self, cursor: &mut Cursor<S>) -> Result<Option<EventTag>> {
        if self.state == GeneratorState::Exhausted {
            return Ok(None);
        }
        if !self.is_live(cursor) {
            self.state = GeneratorState::Exhausted;
            return Ok(None);
        }
        if cursor.depth() > self.depth + 1 {
            cursor.skip_to(self.depth + 1)?;
        }
        match cursor.peek_tag()? {
            Some(tag) => Ok(Some(tag)),
            None => Err(cursor.poison(Error::unexpected_end(format!(
                "event source ended inside an open {}",
                self.kind
            )))),
        }
    }

    fn close<S: EventSource>(&mut self, cursor: &mut Cursor<S>) -> Result<()> {
        cursor.take()?;
        self.state = GeneratorState::Exhausted;
        Ok(())
    }

    fn produce<S: EventSource>(&mut self, cursor: &mut Cursor<S>) -> Result<Value> {
        self.state = GeneratorState::ItemReady;
        let value = decode(cursor)?;
        self.state = GeneratorState::ChildActive;
        Ok(value)
    }

    fn skip<S: EventSource>(&mut self, cursor: &mut Cursor<S>) -> Result<()> {
        if self.state != GeneratorState::Exhausted && self.is_live(cursor) {
            cursor.skip_to(self.depth)?;
        }
        self.state = GeneratorState::Exhausted;
        Ok(())
    }

    fn unexpected<S: EventSource>(&self, cursor: &mut Cursor<S>, tag: EventTag) -> Error {
        let expected = match self.kind {
            ContainerKind::Object => "a key or map end",
            ContainerKind::Array => "a value or array end",
        };
        cursor.poison(Error::structural(format!(
            "expected {expected} inside {}, found {tag}",
            self.kind
        )))
    }
}

/// Lazy `(key, value)` pairs of a JSON object, in document order.
#[derive(Debug)]
pub struct ObjectView {
    generator: ContainerGenerator,
}

impl ObjectView {
    /// Yields the next member. Any part of the previously yielded value that
    /// the caller left unread is skipped first.
    pub fn next<S: EventSource>(
        &mut self,
        cursor: &mut Cursor<S>,
    ) -> Result<Option<(SmolStr, Value)>> {
        let Some(tag) = self.generator.resume(cursor)? else {
            return Ok(None);
        };
        match tag {
            EventTag::MapEnd => {
                self.generator.close(cursor)?;
                Ok(None)
            }
            EventTag::MapKey => {
                let key = match cursor.take()? {
                    Event::MapKey(key) => key,
                    other => return Err(self.generator.unexpected(cursor, other.tag())),
                };
                let value = self.generator.produce(cursor)?;
                Ok(Some((key, value)))
            }
            other => Err(self.generator.unexpected(cursor, other)),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.generator.state == GeneratorState::Exhausted
    }

    pub fn skip<S: EventSource>(&mut self, cursor: &mut Cursor<S>) -> Result<()> {
        self.generator.skip(cursor)
    }

    pub fn entries<'a, S: EventSource>(
        &'a mut self,
        cursor: &'a mut Cursor<S>,
    ) -> Entries<'a, Self, S> {
        Entries::new(self, cursor)
    }
}

/// Lazy `(index, value)` pairs of a JSON array, indices counting from 0.
#[derive(Debug)]
pub struct ArrayView {
    generator: ContainerGenerator,
}

impl ArrayView {
    pub fn next<S: EventSource>(
        &mut self,
        cursor: &mut Cursor<S>,
    ) -> Result<Option<(usize, Value)>> {
        let Some(tag) = self.generator.resume(cursor)? else {
            return Ok(None);
        };
        match tag {
            EventTag::ArrayEnd => {
                self.generator.close(cursor)?;
                Ok(None)
            }
            EventTag::MapStart | EventTag::ArrayStart | EventTag::Scalar => {
                let index = self.generator.next_index;
                self.generator.next_index += 1;
                let value = self.generator.produce(cursor)?;
                Ok(Some((index, value)))
            }
            other => Err(self.generator.unexpected(cursor, other)),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.generator.state == GeneratorState::Exhausted
    }

    pub fn skip<S: EventSource>(&mut self, cursor: &mut Cursor<S>) -> Result<()> {
        self.generator.skip(cursor)
    }

    pub fn entries<'a, S: EventSource>(
        &'a mut self,
        cursor: &'a mut Cursor<S>,
    ) -> Entries<'a, Self, S> {
        Entries::new(self, cursor)
    }
}

/// Common pull interface of [`ObjectView`] and [`ArrayView`].
pub trait Container {
    type Key;

    fn next_entry<S: EventSource>(
        &mut self,
        cursor: &mut Cursor<S>,
    ) -> Result<Option<(Self::Key, Value)>>;
}

impl Container for ObjectView {
    type Key = SmolStr;

    fn next_entry<S: EventSource>(
        &mut self,
        cursor: &mut Cursor<S>,
    ) -> Result<Option<(SmolStr, Value)>> {
        self.next(cursor)
    }
}

impl Container for ArrayView {
    type Key = usize;

    fn next_entry<S: EventSource>(
        &mut self,
        cursor: &mut Cursor<S>,
    ) -> Result<Option<(usize, Value)>> {
        self.next(cursor)
    }
}

/// Iterator over a view's entries that holds the cursor for its lifetime.
///
/// Since the cursor stays borrowed, yielded container values cannot be read
/// inside the loop; they are skipped when the next entry is requested. Useful
/// for listing keys or indices. Fused after the first error.
pub struct Entries<'a, C, S> {
    view: &'a mut C,
    cursor: &'a mut Cursor<S>,
    done: bool,
}

impl<'a, C, S> Entries<'a, C, S> {
    fn new(view: &'a mut C, cursor: &'a mut Cursor<S>) -> Self {
        Self {
            view,
            cursor,
            done: false,
        }
    }
}

impl<C: Container, S: EventSource> Iterator for Entries<'_, C, S> {
    type Item = Result<(C::Key, Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.view.next_entry(self.cursor) {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
