//! Streaming readers.
//!
//! Every reader takes the accumulation buffer by value and hands it back:
//! in a [`ReadStep`] together with the decoded item if one was complete, or
//! in a [`ReadFailure`] when the source fails. A source that runs dry is
//! never an error: the step simply carries no output, and the returned
//! buffer can be passed again once more bytes exist.

use std::io;

use bytes::{Bytes, BytesMut};
use futures_util::stream::{Stream, StreamExt};
use log::{debug, trace};

use crate::codec::{decode_record, peek_record_kind, record_len, Record};
use crate::error::{ReadError, ReadFailure};
use crate::logical::LogicalDataFrame;
use crate::types::{RecordKind, CAPTURE_HEADER_SIZE, RECORD_HEADER_SIZE};

/// Result of one read: the carried buffer and, when complete, an item.
#[derive(Debug)]
pub struct ReadStep<T> {
    pub buffer: BytesMut,
    pub output: Option<T>,
}

fn hand_back<T>(
    buffer: BytesMut,
    result: Result<Option<T>, ReadError>,
) -> Result<ReadStep<T>, ReadFailure> {
    match result {
        Ok(output) => Ok(ReadStep { buffer, output }),
        Err(error) => Err(ReadFailure { buffer, error }),
    }
}

/// Pull chunks until `buffer` holds at least `needed` bytes.
///
/// Returns `false` if the source ends first. Chunks appended before an
/// error stay in `buffer`.
async fn fill_to<S>(source: &mut S, buffer: &mut BytesMut, needed: usize) -> io::Result<bool>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    while buffer.len() < needed {
        match source.next().await {
            Some(chunk) => buffer.extend_from_slice(&chunk?),
            None => return Ok(false),
        }
    }
    Ok(true)
}

async fn drop_header<S>(source: &mut S, buffer: &mut BytesMut) -> Result<bool, ReadError>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    if !fill_to(source, buffer, CAPTURE_HEADER_SIZE).await? {
        trace!("Capture header incomplete: {} bytes buffered", buffer.len());
        return Ok(false);
    }
    let _ = buffer.split_to(CAPTURE_HEADER_SIZE);
    debug!("Skipped {} byte capture header", CAPTURE_HEADER_SIZE);
    Ok(true)
}

async fn take_record<S>(source: &mut S, buffer: &mut BytesMut) -> Result<Option<Record>, ReadError>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    if !fill_to(source, buffer, RECORD_HEADER_SIZE).await? {
        return Ok(None);
    }

    let total_len = match record_len(&buffer[..]) {
        Some(len) => len,
        None => return Ok(None),
    };
    if !fill_to(source, buffer, total_len).await? {
        trace!(
            "Partial record: {} of {} bytes buffered",
            buffer.len(),
            total_len
        );
        return Ok(None);
    }

    let envelope = buffer.split_to(total_len);
    let record = decode_record(&envelope)?;
    trace!(
        "Record: {} {} session={} len={}",
        record.kind(),
        record.direction,
        record.session,
        record.payload.len()
    );
    Ok(Some(record))
}

/// Collect the next logical frame.
///
/// Records are only consumed once the frame is closed. With `close_at_end`
/// unset, a frame still open when the source runs dry stays buffered.
async fn assemble_frame<S>(
    source: &mut S,
    buffer: &mut BytesMut,
    close_at_end: bool,
) -> Result<Option<LogicalDataFrame>, ReadError>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    loop {
        if !fill_to(source, buffer, RECORD_HEADER_SIZE + 1).await? {
            return Ok(None);
        }
        if peek_record_kind(&buffer[..]) == Some(RecordKind::RadioData) {
            break;
        }
        match take_record(source, buffer).await? {
            Some(record) => debug!("Skipping {} record outside a frame", record.kind()),
            None => return Ok(None),
        }
    }

    let base_len = match record_len(&buffer[..]) {
        Some(len) => len,
        None => return Ok(None),
    };
    if !fill_to(source, buffer, base_len).await? {
        return Ok(None);
    }

    let mut lengths = vec![base_len];
    let mut end = base_len;
    let open_at_end = loop {
        if !fill_to(source, buffer, end + RECORD_HEADER_SIZE + 1).await? {
            break true;
        }
        match peek_record_kind(&buffer[end..]) {
            Some(kind) if !kind.is_boundary() => {}
            _ => break false,
        }
        let next_end = match record_len(&buffer[end..]).and_then(|len| end.checked_add(len)) {
            Some(next_end) => next_end,
            None => break true,
        };
        if !fill_to(source, buffer, next_end).await? {
            break true;
        }
        lengths.push(next_end - end);
        end = next_end;
    };

    if open_at_end && !close_at_end {
        trace!(
            "Frame open at end of stream: {} record(s) held",
            lengths.len()
        );
        return Ok(None);
    }

    let frame_bytes = buffer.split_to(end).freeze();
    let mut records = Vec::with_capacity(lengths.len());
    let mut offset = 0;
    for len in lengths {
        records.push(decode_record(&frame_bytes[offset..offset + len])?);
        offset += len;
    }

    let frame = LogicalDataFrame::new(records)?;
    debug!(
        "Logical frame: {} record(s), {} bytes",
        frame.records().len(),
        frame.payload().len()
    );
    Ok(Some(frame))
}

/// Drop the capture file header.
///
/// Returns the buffer and `true` once [`CAPTURE_HEADER_SIZE`] bytes were
/// discarded, or the untouched buffer and `false` if the source ended first.
pub async fn skip_capture_header<S>(
    source: &mut S,
    mut buffer: BytesMut,
) -> Result<(BytesMut, bool), ReadFailure>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    match drop_header(source, &mut buffer).await {
        Ok(skipped) => Ok((buffer, skipped)),
        Err(error) => Err(ReadFailure { buffer, error }),
    }
}

/// Extract exactly one record.
pub async fn read_record<S>(
    source: &mut S,
    mut buffer: BytesMut,
) -> Result<ReadStep<Record>, ReadFailure>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    let result = take_record(source, &mut buffer).await;
    hand_back(buffer, result)
}

/// Assemble the next logical data frame.
///
/// Records ahead of the first radio-data record are discarded. Following
/// records are folded into the frame until the next command or radio-data
/// record, which stays in the buffer, or until the source ends.
pub async fn read_logical_frame<S>(
    source: &mut S,
    mut buffer: BytesMut,
) -> Result<ReadStep<LogicalDataFrame>, ReadFailure>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    let result = assemble_frame(source, &mut buffer, true).await;
    hand_back(buffer, result)
}

/// Owns a chunk source and its buffer.
///
/// The buffer survives source errors, so a failed call can be retried.
pub struct CaptureReader<S> {
    source: S,
    buffer: BytesMut,
}

impl<S> CaptureReader<S>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    pub fn new(source: S) -> Self {
        Self::with_buffer(source, BytesMut::new())
    }

    /// Resume with bytes carried over from an earlier reader.
    pub fn with_buffer(source: S, buffer: BytesMut) -> Self {
        CaptureReader { source, buffer }
    }

    pub async fn skip_header(&mut self) -> Result<bool, ReadError> {
        drop_header(&mut self.source, &mut self.buffer).await
    }

    pub async fn next_record(&mut self) -> Result<Option<Record>, ReadError> {
        take_record(&mut self.source, &mut self.buffer).await
    }

    /// Next logical frame; the end of the source closes an open frame.
    pub async fn next_frame(&mut self) -> Result<Option<LogicalDataFrame>, ReadError> {
        assemble_frame(&mut self.source, &mut self.buffer, true).await
    }

    /// Next logical frame closed by a command or radio-data record.
    ///
    /// A frame still open when the source runs dry stays buffered, so its
    /// continuations can arrive later on a resumed reader.
    pub async fn next_closed_frame(&mut self) -> Result<Option<LogicalDataFrame>, ReadError> {
        assemble_frame(&mut self.source, &mut self.buffer, false).await
    }

    /// Bytes buffered but not yet consumed.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Release the source and hand back the carried buffer.
    pub fn into_buffer(self) -> BytesMut {
        self.buffer
    }
}
