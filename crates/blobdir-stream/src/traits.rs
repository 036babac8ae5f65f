use std::fmt;
use std::io::{Read, Seek, Write};

use crate::error::StreamResult;

/// A file being written into a directory.
///
/// Bytes become visible to other readers of the directory only after a
/// successful [`close`](IndexOutput::close).
pub trait IndexOutput: Write + Send + fmt::Debug {
    fn name(&self) -> &str;

    /// CRC-32 of every byte written so far.
    fn checksum(&self) -> u32;

    /// Number of bytes written so far.
    fn file_pointer(&self) -> u64;

    /// Finish the file. Safe to call again after a failure to retry, and a
    /// no-op once it has succeeded.
    fn close(&mut self) -> StreamResult<()>;
}

/// A file opened for random-access reading.
pub trait IndexInput: Read + Seek + Send + fmt::Debug {
    fn name(&self) -> &str;

    /// Total length of the file in bytes.
    fn length(&self) -> u64;

    /// Current read position.
    fn file_pointer(&self) -> u64;

    /// Open an independent handle on the same file at the same position.
    fn try_clone(&self) -> StreamResult<Box<dyn IndexInput>>;
}
