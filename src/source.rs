use std::io::Read;

use serde_json::Number;
use smol_str::SmolStr;
use struson::reader::{
    JsonReader, JsonReaderPosition, JsonStreamReader, ReaderError, ReaderSettings,
    SyntaxErrorKind, ValueType,
};

use crate::event::{Event, EventSource, Literal};
use crate::{Error, Location, ReaderOptions, Result};

#[derive(Debug, Clone, Copy)]
enum Open {
    Object { expect_key: bool },
    Array,
}

/// Event source over a JSON byte stream.
///
/// Tokenizing is delegated to `struson`; this type only translates its pull
/// API into [`Event`]s and tracks which container the tokenizer is inside.
pub struct JsonEvents<R: Read> {
    reader: Option<JsonStreamReader<R>>,
    open: Vec<Open>,
    root_done: bool,
}

impl<R: Read> JsonEvents<R> {
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, &ReaderOptions::default())
    }

    pub fn with_options(reader: R, options: &ReaderOptions) -> Self {
        let settings = ReaderSettings {
            allow_comments: options.allow_comments,
            allow_trailing_comma: options.allow_trailing_comma,
            max_nesting_depth: options.max_nesting_depth,
            ..ReaderSettings::default()
        };
        Self {
            reader: Some(JsonStreamReader::new_custom(reader, settings)),
            open: Vec::new(),
            root_done: false,
        }
    }

    fn finish_document(&mut self) -> Result<()> {
        if let Some(reader) = self.reader.take() {
            reader
                .consume_trailing_whitespace()
                .map_err(map_reader_error)?;
        }
        Ok(())
    }
}

impl<R: Read> EventSource for JsonEvents<R> {
    fn next_event(&mut self) -> Result<Option<Event>> {
        if self.root_done {
            self.finish_document()?;
            return Ok(None);
        }
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };

        let event = match self.open.last().copied() {
            None => read_value(reader, &mut self.open)?,
            Some(Open::Object { expect_key: true }) => {
                if reader.has_next().map_err(map_reader_error)? {
                    let name = reader.next_name_owned().map_err(map_reader_error)?;
                    if let Some(Open::Object { expect_key }) = self.open.last_mut() {
                        *expect_key = false;
                    }
                    Event::MapKey(SmolStr::from(name))
                } else {
                    reader.end_object().map_err(map_reader_error)?;
                    self.open.pop();
                    Event::MapEnd
                }
            }
            Some(Open::Object { expect_key: false }) => {
                if let Some(Open::Object { expect_key }) = self.open.last_mut() {
                    *expect_key = true;
                }
                read_value(reader, &mut self.open)?
            }
            Some(Open::Array) => {
                if reader.has_next().map_err(map_reader_error)? {
                    read_value(reader, &mut self.open)?
                } else {
                    reader.end_array().map_err(map_reader_error)?;
                    self.open.pop();
                    Event::ArrayEnd
                }
            }
        };

        if self.open.is_empty() {
            self.root_done = true;
        }
        Ok(Some(event))
    }
}

fn read_value<R: Read>(reader: &mut JsonStreamReader<R>, open: &mut Vec<Open>) -> Result<Event> {
    let event = match reader.peek().map_err(map_reader_error)? {
        ValueType::Object => {
            reader.begin_object().map_err(map_reader_error)?;
            open.push(Open::Object { expect_key: true });
            Event::MapStart
        }
        ValueType::Array => {
            reader.begin_array().map_err(map_reader_error)?;
            open.push(Open::Array);
            Event::ArrayStart
        }
        ValueType::String => {
            let value = reader.next_string().map_err(map_reader_error)?;
            Event::Scalar(Literal::String(value))
        }
        ValueType::Number => {
            let raw = reader.next_number_as_string().map_err(map_reader_error)?;
            let number = serde_json::from_str::<Number>(&raw)
                .map_err(|err| Error::malformed(format!("unsupported number '{raw}': {err}")))?;
            Event::Scalar(Literal::Number(number))
        }
        ValueType::Boolean => {
            let value = reader.next_bool().map_err(map_reader_error)?;
            Event::Scalar(Literal::Bool(value))
        }
        ValueType::Null => {
            reader.next_null().map_err(map_reader_error)?;
            Event::Scalar(Literal::Null)
        }
    };
    Ok(event)
}

fn map_reader_error(err: ReaderError) -> Error {
    let message = err.to_string();
    match &err {
        ReaderError::SyntaxError(syntax) => {
            let mapped = if syntax.kind == SyntaxErrorKind::IncompleteDocument {
                Error::unexpected_end(message)
            } else {
                Error::malformed(message)
            };
            attach_location(mapped, &syntax.location)
        }
        ReaderError::UnsupportedNumberValue { location, .. } => {
            attach_location(Error::malformed(message), location)
        }
        ReaderError::MaxNestingDepthExceeded { location, .. } => {
            attach_location(Error::malformed(message), location)
        }
        ReaderError::IoError { location, .. } => attach_location(Error::io(message), location),
        ReaderError::UnexpectedValueType { location, .. }
        | ReaderError::UnexpectedStructure { location, .. } => {
            attach_location(Error::structural(message), location)
        }
        _ => Error::malformed(message),
    }
}

// struson counts lines and columns from 0.
fn attach_location(err: Error, position: &JsonReaderPosition) -> Error {
    match &position.line_pos {
        Some(line_pos) => err.with_location(Location {
            offset: position.data_pos,
            line: line_pos.line + 1,
            column: line_pos.column + 1,
        }),
        None => err,
    }
}
