use tracing::{debug, trace};

use crate::event::{Event, EventSource, EventTag};
use crate::view::{self, Value};
use crate::{Error, Result};

pub(crate) type ContainerId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Object,
    Array,
}

impl std::fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerKind::Object => f.write_str("object"),
            ContainerKind::Array => f.write_str("array"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Frame {
    pub id: ContainerId,
    pub kind: ContainerKind,
}

/// Counters describing how much of the stream a cursor has walked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CursorStats {
    /// Events pulled from the source.
    pub events: u64,
    /// Events drained without being handed to a caller.
    pub skipped_events: u64,
    /// Scalars decoded into a [`Value`] for a caller.
    pub scalars_decoded: u64,
}

/// The single forward-only read position into an event stream.
///
/// Every view borrows the cursor only for the duration of a call, so there is
/// exactly one writer at any instant. The cursor records every open container;
/// views use that record to find out whether they are still live and to drain
/// abandoned children before moving on.
pub struct Cursor<S> {
    source: S,
    peeked: Option<Event>,
    frames: Vec<Frame>,
    next_id: ContainerId,
    stats: CursorStats,
    failed: Option<Error>,
}

impl<S: EventSource> Cursor<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            peeked: None,
            frames: Vec::new(),
            next_id: 0,
            stats: CursorStats::default(),
            failed: None,
        }
    }

    /// Tag of the next event without consuming it; `None` at end of stream.
    pub fn peek_tag(&mut self) -> Result<Option<EventTag>> {
        self.check_failed()?;
        if self.peeked.is_none() {
            let next = self.source.next_event();
            self.peeked = self.record(next)?;
        }
        Ok(self.peeked.as_ref().map(Event::tag))
    }

    /// Consumes the next event.
    pub fn take(&mut self) -> Result<Event> {
        self.check_failed()?;
        let event = match self.peeked.take() {
            Some(event) => event,
            None => {
                let next = self.source.next_event();
                match self.record(next)? {
                    Some(event) => event,
                    None => {
                        let open = self.frames.len();
                        return Err(self.poison(Error::unexpected_end(format!(
                            "event source ended with {open} container(s) still open"
                        ))));
                    }
                }
            }
        };
        self.stats.events += 1;
        self.track(&event)?;
        Ok(event)
    }

    /// Decodes the value at the current position.
    pub fn decode(&mut self) -> Result<Value> {
        view::decode(self)
    }

    /// Number of containers currently open.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn stats(&self) -> CursorStats {
        self.stats
    }

    pub fn is_failed(&self) -> bool {
        self.failed.is_some()
    }

    /// Drains events until only `depth` containers remain open.
    ///
    /// Scalars passed over are dropped without being decoded for anyone.
    pub fn skip_to(&mut self, depth: usize) -> Result<u64> {
        let mut skipped = 0u64;
        while self.frames.len() > depth {
            self.take()?;
            skipped += 1;
        }
        if skipped > 0 {
            self.stats.skipped_events += skipped;
            trace!(skipped, depth, "skipped subtree");
        }
        Ok(skipped)
    }

    /// Drains whatever is left of the document and checks that the source
    /// reports end of stream.
    pub fn finish(&mut self) -> Result<()> {
        self.skip_to(0)?;
        if let Some(tag) = self.peek_tag()? {
            return Err(self.poison(Error::structural(format!(
                "unexpected {tag} after the document root"
            ))));
        }
        debug!(
            events = self.stats.events,
            skipped = self.stats.skipped_events,
            "document finished"
        );
        Ok(())
    }

    pub fn into_source(self) -> S {
        self.source
    }

    pub(crate) fn frame(&self, depth: usize) -> Option<Frame> {
        self.frames.get(depth).copied()
    }

    pub(crate) fn note_scalar_decoded(&mut self) {
        self.stats.scalars_decoded += 1;
    }

    /// Records `err` as the terminal state of this cursor and hands it back.
    pub(crate) fn poison(&mut self, err: Error) -> Error {
        if self.failed.is_none() {
            self.failed = Some(err.clone());
        }
        err
    }

    fn check_failed(&self) -> Result<()> {
        match &self.failed {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn record(&mut self, next: Result<Option<Event>>) -> Result<Option<Event>> {
        next.map_err(|err| self.poison(err))
    }

    fn track(&mut self, event: &Event) -> Result<()> {
        match event {
            Event::MapStart => self.open(ContainerKind::Object),
            Event::ArrayStart => self.open(ContainerKind::Array),
            Event::MapEnd => self.close(ContainerKind::Object)?,
            Event::ArrayEnd => self.close(ContainerKind::Array)?,
            Event::MapKey(_) => {
                if self.frames.last().map(|frame| frame.kind) != Some(ContainerKind::Object) {
                    return Err(self.poison(Error::structural("map key outside of an object")));
                }
            }
            Event::Scalar(_) => {}
        }
        Ok(())
    }

    fn open(&mut self, kind: ContainerKind) {
        let id = self.next_id;
        self.next_id += 1;
        self.frames.push(Frame { id, kind });
    }

    fn close(&mut self, kind: ContainerKind) -> Result<()> {
        match self.frames.last() {
            Some(frame) if frame.kind == kind => {
                self.frames.pop();
                Ok(())
            }
            Some(frame) => {
                let open = frame.kind;
                Err(self.poison(Error::structural(format!(
                    "{kind} close while an {open} is open"
                ))))
            }
            None => Err(self.poison(Error::structural(format!(
                "{kind} close without an open container"
            )))),
        }
    }
}
