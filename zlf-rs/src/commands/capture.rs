//! Capture listing command handlers.

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::BytesMut;
use futures_executor::block_on;
use futures_util::io::AllowStdIo;
use futures_util::stream::Stream;
use log::{debug, error, info, warn};

use zlf_protocol::{chunks, CaptureReader, LogicalDataFrame, ReadError, Record};

use super::output::{FrameRow, Printer, RecordRow};
use crate::config::ScanSettings;
use crate::context::OutputFormat;

/// What to extract from the capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Unit {
    Records,
    Frames,
}

#[derive(Debug)]
pub(crate) enum Item {
    Record(Record),
    Frame(LogicalDataFrame),
}

/// Next item; with `close_at_end` unset a frame open at end of file is held.
async fn next_item<S>(
    reader: &mut CaptureReader<S>,
    unit: Unit,
    close_at_end: bool,
) -> Result<Option<Item>, ReadError>
where
    S: Stream<Item = io::Result<bytes::Bytes>> + Unpin,
{
    Ok(match unit {
        Unit::Records => reader.next_record().await?.map(Item::Record),
        Unit::Frames if close_at_end => reader.next_frame().await?.map(Item::Frame),
        Unit::Frames => reader.next_closed_frame().await?.map(Item::Frame),
    })
}

/// Read every item from the capture at `path` and pass it to `sink`.
///
/// With `follow`, an exhausted file is polled again after the configured
/// interval, resuming with the bytes already buffered, until `stop` is set.
/// A frame open at end of file waits for its continuations; the pass after
/// `stop` closes it.
pub(crate) fn scan_capture<F>(
    path: &Path,
    settings: &ScanSettings,
    unit: Unit,
    stop: &AtomicBool,
    mut sink: F,
) -> Result<usize, Box<dyn std::error::Error>>
where
    F: FnMut(Item) -> io::Result<()>,
{
    let mut file = AllowStdIo::new(File::open(path)?);
    let mut buffer = BytesMut::new();
    let mut header_pending = settings.skip_header;
    let mut count = 0;

    block_on(async {
        loop {
            let last_pass = !settings.follow || stop.load(Ordering::Relaxed);
            let mut interrupted = false;
            let mut reader =
                CaptureReader::with_buffer(chunks(&mut file, settings.chunk_size), buffer);

            if header_pending {
                header_pending = !reader.skip_header().await?;
            }
            if !header_pending {
                while let Some(item) = next_item(&mut reader, unit, last_pass).await? {
                    sink(item)?;
                    count += 1;
                    if stop.load(Ordering::Relaxed) {
                        interrupted = true;
                        break;
                    }
                }
            }

            buffer = reader.into_buffer();
            if last_pass || interrupted {
                break;
            }
            if !stop.load(Ordering::Relaxed) {
                debug!("End of file reached, {} bytes carried", buffer.len());
                std::thread::sleep(settings.poll_interval);
            }
        }

        if header_pending {
            warn!("File is shorter than the capture header");
        } else if !buffer.is_empty() {
            warn!(
                "{} trailing bytes do not form a complete record",
                buffer.len()
            );
        }
        Ok::<_, Box<dyn std::error::Error>>(())
    })?;

    Ok(count)
}

/// Stop flag that Ctrl-C sets while following a growing file.
fn stop_flag(follow: bool) -> Arc<AtomicBool> {
    let stop = Arc::new(AtomicBool::new(false));
    if follow {
        let handler_flag = stop.clone();
        if let Err(e) = ctrlc::set_handler(move || handler_flag.store(true, Ordering::Relaxed)) {
            warn!("Failed to install Ctrl-C handler: {}", e);
        }
    }
    stop
}

/// Records command implementation.
pub fn cmd_records(path: &Path, settings: ScanSettings, format: OutputFormat) -> i32 {
    info!("Reading records from {}", path.display());
    let stop = stop_flag(settings.follow);
    let mut printer = Printer::new(io::stdout().lock(), format);

    let result = printer.begin::<RecordRow>().map_err(Into::into).and_then(|_| {
        let mut index = 0;
        scan_capture(path, &settings, Unit::Records, &stop, |item| {
            if let Item::Record(record) = item {
                printer.row(&RecordRow::new(index, &record))?;
                index += 1;
            }
            Ok(())
        })
    });

    match result {
        Ok(_) => match printer.finish("records") {
            Ok(()) => 0,
            Err(e) => {
                error!("Failed to write output: {}", e);
                1
            }
        },
        Err(e) => {
            error!("Failed to read {}: {}", path.display(), e);
            1
        }
    }
}

/// Frames command implementation.
pub fn cmd_frames(
    path: &Path,
    settings: ScanSettings,
    format: OutputFormat,
    bad_only: bool,
) -> i32 {
    info!("Reading frames from {}", path.display());
    let stop = stop_flag(settings.follow);
    let mut printer = Printer::new(io::stdout().lock(), format);
    let mut undecodable = 0usize;

    let result = printer.begin::<FrameRow>().map_err(Into::into).and_then(|_| {
        let mut index = 0;
        scan_capture(path, &settings, Unit::Frames, &stop, |item| {
            let Item::Frame(frame) = item else {
                return Ok(());
            };
            let current = index;
            index += 1;

            match FrameRow::new(current, &frame) {
                Ok(row) if bad_only && row.checksum_ok => Ok(()),
                Ok(row) => printer.row(&row),
                Err(e) => {
                    warn!("Frame #{} skipped: {}", current, e);
                    undecodable += 1;
                    Ok(())
                }
            }
        })
    });

    match result {
        Ok(total) => {
            if undecodable > 0 {
                warn!("{} of {} frames could not be decoded", undecodable, total);
            }
            match printer.finish("frames") {
                Ok(()) => 0,
                Err(e) => {
                    error!("Failed to write output: {}", e);
                    1
                }
            }
        }
        Err(e) => {
            error!("Failed to read {}: {}", path.display(), e);
            1
        }
    }
}
