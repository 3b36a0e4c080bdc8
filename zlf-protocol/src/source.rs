//! Chunk sources.
//!
//! The readers pull bytes from any `Stream<Item = io::Result<Bytes>>`. This
//! module adapts an [`AsyncRead`] into one.

use std::io;

use bytes::Bytes;
use futures_util::io::{AsyncRead, AsyncReadExt};
use futures_util::stream::{self, LocalBoxStream, StreamExt};

/// Default read size for [`chunks`].
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Turn `reader` into a stream of chunks of at most `chunk_size` bytes.
///
/// The stream ends when the reader returns 0 bytes, or after yielding the
/// first I/O error. It is fused, so polling past the end keeps returning
/// `None`. Pass `&mut reader` to build a fresh stream over the same handle
/// once a growing file has more data.
pub fn chunks<'a, R>(reader: R, chunk_size: usize) -> LocalBoxStream<'a, io::Result<Bytes>>
where
    R: AsyncRead + Unpin + 'a,
{
    let chunk_size = chunk_size.max(1);
    stream::unfold(Some(reader), move |state| async move {
        let mut reader = state?;
        let mut buf = vec![0u8; chunk_size];
        match reader.read(&mut buf).await {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                Some((Ok(Bytes::from(buf)), Some(reader)))
            }
            Err(e) => Some((Err(e), None)),
        }
    })
    .fuse()
    .boxed_local()
}
