use crate::domain::event::InboundEvent;
use crate::error::{Result, ShopError};
use std::io::{BufRead, BufReader, Read};

/// Reads inbound events from a newline-delimited JSON source.
///
/// One event per line; blank lines are skipped. A malformed line yields an
/// error for that line without stopping the stream, so one bad event never
/// takes down a replay.
pub struct EventReader<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> EventReader<R> {
    /// Creates a new `EventReader` from any `Read` source (e.g. File, Stdin).
    pub fn new(source: R) -> Self {
        Self {
            reader: BufReader::new(source),
        }
    }

    /// Returns an iterator that lazily reads and decodes events.
    pub fn events(self) -> impl Iterator<Item = Result<InboundEvent>> {
        self.reader.lines().filter_map(|line| match line {
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => Some(serde_json::from_str(&line).map_err(ShopError::from)),
            Err(e) => Some(Err(ShopError::from(e))),
        })
    }
}
