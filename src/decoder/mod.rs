//! Streaming decoder for the click event array
//!
//! The event source is a single JSON array of objects. Records are decoded one
//! at a time straight off the reader, so memory use does not grow with the
//! number of events. The framing rules are:
//!
//! - the first non-whitespace byte must open an array,
//! - elements are separated by commas,
//! - a closing bracket ends the stream, and so does a clean end of input.
//!
//! Any structural fault aborts the stream with the 0-based index of the record
//! that failed. Records already handed out stay handed out.

use std::io::{BufRead, BufReader, Read};

use serde::de::Error as _;
use serde::Deserialize;
use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::models::ClickEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Array not opened yet.
    Start,
    /// Inside the array, before the first element.
    First,
    /// Inside the array, after at least one element.
    Rest,
    /// Closed, exhausted, or failed.
    Done,
}

/// Lazy iterator of click events read from a JSON array.
///
/// Yields `Err` at most once; after that, or after the array closes, it only
/// yields `None`.
pub struct EventStream<R> {
    reader: R,
    state: State,
    index: usize,
}

impl<R: BufRead> EventStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            state: State::Start,
            index: 0,
        }
    }

    /// Number of records decoded so far.
    pub fn decoded(&self) -> usize {
        self.index
    }

    /// Skip whitespace and return the next byte without consuming it.
    fn peek_token(&mut self) -> Result<Option<u8>> {
        loop {
            let buf = self.reader.fill_buf()?;
            if buf.is_empty() {
                return Ok(None);
            }

            let skip = buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
            if skip < buf.len() {
                let token = buf[skip];
                self.reader.consume(skip);
                return Ok(Some(token));
            }

            let len = buf.len();
            self.reader.consume(len);
        }
    }

    fn open(&mut self) -> Result<()> {
        match self.peek_token()? {
            Some(b'[') => {
                self.reader.consume(1);
                Ok(())
            }
            Some(other) => Err(Error::Framing(describe(other))),
            None => Err(Error::Framing("end of input".to_string())),
        }
    }

    /// Position the reader on the next element, or report the end of the array.
    fn next_element(&mut self) -> Result<bool> {
        if self.state == State::Start {
            self.open()?;
            self.state = State::First;
        }

        match (self.state, self.peek_token()?) {
            (_, Some(b']')) => {
                self.reader.consume(1);
                Ok(false)
            }
            (_, None) => Ok(false),
            (State::First, Some(_)) => Ok(true),
            (_, Some(b',')) => {
                self.reader.consume(1);
                Ok(true)
            }
            (_, Some(other)) => Err(Error::Decode {
                index: self.index,
                source: serde_json::Error::custom(format!(
                    "expected `,` or `]` after array element, found {}",
                    describe(other)
                )),
            }),
        }
    }

    /// Elements must be JSON objects.
    fn decode_element(&mut self) -> Result<ClickEvent> {
        match self.peek_token()? {
            Some(b'{') => {}
            other => {
                return Err(Error::Decode {
                    index: self.index,
                    source: serde_json::Error::custom(format!(
                        "expected object for array element, found {}",
                        other.map_or_else(|| "end of input".to_string(), describe)
                    )),
                })
            }
        }

        let mut deserializer = serde_json::Deserializer::from_reader(&mut self.reader);
        let event = ClickEvent::deserialize(&mut deserializer).map_err(|source| Error::Decode {
            index: self.index,
            source,
        })?;
        self.index += 1;
        self.state = State::Rest;
        Ok(event)
    }
}

impl<R: BufRead> Iterator for EventStream<R> {
    type Item = Result<ClickEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state == State::Done {
            return None;
        }

        let step = self
            .next_element()
            .and_then(|more| more.then(|| self.decode_element()).transpose());

        match step {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => {
                self.state = State::Done;
                None
            }
            Err(err) => {
                self.state = State::Done;
                Some(Err(err))
            }
        }
    }
}

fn describe(byte: u8) -> String {
    if byte.is_ascii_graphic() {
        format!("`{}`", byte as char)
    } else {
        format!("byte 0x{byte:02x}")
    }
}

/// Decode every record of `source` and hand each one to `on_record`.
///
/// `on_record` runs to completion before the next record is decoded. The
/// first error, from the decoder or from the handler, stops the stream and is
/// returned unchanged. Returns the number of records delivered.
pub fn stream<R, F>(source: R, mut on_record: F) -> Result<usize>
where
    R: Read,
    F: FnMut(ClickEvent) -> Result<()>,
{
    let mut events = EventStream::new(BufReader::new(source));
    let mut delivered = 0;

    for event in events.by_ref() {
        let event = event.inspect_err(|e| error!("Event stream aborted: {}", e))?;

        on_record(event)
            .inspect_err(|e| error!("Handler failed for record {}: {}", delivered, e))?;
        delivered += 1;
    }

    debug!("Event stream finished after {} record(s)", events.decoded());
    Ok(delivered)
}
