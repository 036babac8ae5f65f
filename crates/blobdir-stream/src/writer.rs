use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;

use blobdir_store::{LocalStore, LocalWrite};
use tracing::{debug, warn};

use crate::checksum::ChecksumWriter;
use crate::codec;
use crate::context::CacheContext;
use crate::error::StreamResult;
use crate::guard::NameGuard;
use crate::metadata::CacheMetadata;
use crate::traits::IndexOutput;

fn closed_error(name: &str) -> io::Error {
    io::Error::other(format!("output {name} is closed"))
}

/// Write stream that buffers into the local cache and uploads on close.
///
/// Holds the per-name guard from creation until the upload succeeds (or the
/// stream is dropped), so no other in-process writer, cache fill, or delete
/// of the same name interleaves with it.
pub struct BlobOutput {
    ctx: Arc<CacheContext>,
    name: String,
    local: Option<ChecksumWriter<LocalWrite>>,
    checksum: u32,
    length: u64,
    uploaded: bool,
    guard: Option<NameGuard>,
}

impl BlobOutput {
    /// Take the guard for `name` and open a fresh cache file.
    pub fn create(ctx: Arc<CacheContext>, name: &str) -> StreamResult<Self> {
        let guard = ctx.guards().acquire(name);
        let file = ctx.local().create(name)?;
        debug!(name, "opened blob output");
        Ok(Self {
            ctx,
            name: name.to_string(),
            local: Some(ChecksumWriter::new(file)),
            checksum: 0,
            length: 0,
            uploaded: false,
            guard: Some(guard),
        })
    }

    /// Whether the remote copy has been written.
    pub fn is_uploaded(&self) -> bool {
        self.uploaded
    }

    fn finish_local(&mut self) -> StreamResult<()> {
        if let Some(mut file) = self.local.take() {
            if let Err(e) = file.flush() {
                self.local = Some(file);
                return Err(e.into());
            }
            self.checksum = file.checksum();
            self.length = file.written();
        }
        Ok(())
    }

    fn upload(&self) -> StreamResult<()> {
        let key = self.ctx.key(&self.name);
        let local = self.ctx.local();
        let original_length = local.length(&self.name)?;
        let modified = local.modified(&self.name)?;

        if self.ctx.should_compress(&self.name) {
            // The upload needs a length-bounded, re-readable payload, so the
            // whole file is deflated into memory first.
            let mut raw = Vec::with_capacity(original_length as usize);
            local.open(&self.name)?.read_to_end(&mut raw)?;
            let packed = codec::compress(&raw)?;
            let packed_len = packed.len() as u64;
            self.ctx
                .blob()
                .upload(&key, &mut Cursor::new(packed), packed_len)?;
            debug!(key = %key, original_length, packed_len, "uploaded compressed blob");
        } else {
            let mut file = local.open(&self.name)?;
            self.ctx.blob().upload(&key, &mut file, original_length)?;
            debug!(key = %key, original_length, "uploaded blob");
        }

        let metadata = CacheMetadata::encode(original_length, modified);
        self.ctx.blob().set_metadata(&key, &metadata)?;
        Ok(())
    }
}

impl Write for BlobOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.local.as_mut() {
            Some(file) => file.write(buf),
            None => Err(closed_error(&self.name)),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.local.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl IndexOutput for BlobOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn checksum(&self) -> u32 {
        match &self.local {
            Some(file) => file.checksum(),
            None => self.checksum,
        }
    }

    fn file_pointer(&self) -> u64 {
        match &self.local {
            Some(file) => file.written(),
            None => self.length,
        }
    }

    /// Close the cache file and upload it with its metadata.
    ///
    /// On failure the complete cache file stays on disk and the guard stays
    /// held; calling `close` again retries the upload.
    fn close(&mut self) -> StreamResult<()> {
        if self.uploaded {
            return Ok(());
        }
        self.finish_local()?;
        self.upload()?;
        self.uploaded = true;
        self.guard = None;
        Ok(())
    }
}

impl Drop for BlobOutput {
    fn drop(&mut self) {
        if !self.uploaded {
            if let Err(e) = self.close() {
                warn!(name = %self.name, error = %e, "failed to upload blob output on drop");
            }
        }
    }
}

impl std::fmt::Debug for BlobOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobOutput")
            .field("name", &self.name)
            .field("uploaded", &self.uploaded)
            .finish()
    }
}

/// Write stream for a plain local directory.
pub struct LocalOutput {
    name: String,
    local: Option<ChecksumWriter<LocalWrite>>,
    checksum: u32,
    length: u64,
}

impl LocalOutput {
    pub fn create(local: &dyn LocalStore, name: &str) -> StreamResult<Self> {
        let file = local.create(name)?;
        Ok(Self {
            name: name.to_string(),
            local: Some(ChecksumWriter::new(file)),
            checksum: 0,
            length: 0,
        })
    }
}

impl Write for LocalOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.local.as_mut() {
            Some(file) => file.write(buf),
            None => Err(closed_error(&self.name)),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.local.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl IndexOutput for LocalOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn checksum(&self) -> u32 {
        match &self.local {
            Some(file) => file.checksum(),
            None => self.checksum,
        }
    }

    fn file_pointer(&self) -> u64 {
        match &self.local {
            Some(file) => file.written(),
            None => self.length,
        }
    }

    fn close(&mut self) -> StreamResult<()> {
        if let Some(mut file) = self.local.take() {
            if let Err(e) = file.flush() {
                self.local = Some(file);
                return Err(e.into());
            }
            self.checksum = file.checksum();
            self.length = file.written();
        }
        Ok(())
    }
}

impl std::fmt::Debug for LocalOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalOutput")
            .field("name", &self.name)
            .field("closed", &self.local.is_none())
            .finish()
    }
}
