use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use blobdir_store::{BlobProperties, LocalRead, LocalStore, LocalWrite};
use tracing::{debug, warn};

use crate::codec;
use crate::context::CacheContext;
use crate::error::StreamResult;
use crate::metadata::CacheMetadata;
use crate::traits::IndexInput;

/// Read stream over a file in the local cache.
///
/// Reads never touch the remote store; [`CacheInput::fetch`] makes sure the
/// cache copy is present and current before the stream is opened.
pub struct CacheInput {
    local: Arc<dyn LocalStore>,
    name: String,
    file: Box<dyn LocalRead>,
    length: u64,
    pos: u64,
}

impl CacheInput {
    /// Open the cache file as it is now.
    pub fn open_local(local: Arc<dyn LocalStore>, name: &str) -> StreamResult<Self> {
        let file = local.open(name)?;
        let length = local.length(name)?;
        Ok(Self {
            local,
            name: name.to_string(),
            file,
            length,
            pos: 0,
        })
    }

    /// Bring the cache copy of `name` up to date with the remote object
    /// described by `props`, then open it.
    pub fn fetch(ctx: &Arc<CacheContext>, name: &str, props: &BlobProperties) -> StreamResult<Self> {
        if !is_fresh(ctx, name, props)? {
            let _guard = ctx.guards().acquire(name);
            // A writer or another reader may have filled it while we waited.
            if !is_fresh(ctx, name, props)? {
                fill(ctx, name)?;
            }
        }
        Self::open_local(Arc::clone(ctx.local()), name)
    }
}

/// Length the cache copy must have to be considered current, if known.
fn expected_length(ctx: &CacheContext, name: &str, props: &BlobProperties) -> Option<u64> {
    let meta = CacheMetadata::parse(&props.metadata);
    match meta.length {
        Some(length) => Some(length),
        // Without metadata an uncompressed object's own length still tells.
        None if !ctx.should_compress(name) => Some(props.content_length),
        None => None,
    }
}

fn is_fresh(ctx: &CacheContext, name: &str, props: &BlobProperties) -> StreamResult<bool> {
    let local = ctx.local();
    if !local.exists(name)? {
        return Ok(false);
    }
    let cached = local.length(name)?;
    Ok(expected_length(ctx, name, props) == Some(cached))
}

/// Download the object into the cache, replacing any existing copy.
///
/// Fails without touching the cache copy while another handle has it open.
/// Once the copy has been truncated, a failed download removes the partial
/// file.
fn fill(ctx: &CacheContext, name: &str) -> StreamResult<()> {
    let key = ctx.key(name);
    let mut file = ctx.local().create(name)?;
    let result = download_into(ctx, &key, name, &mut file);
    drop(file);
    if result.is_err() {
        if let Err(e) = ctx.local().delete(name) {
            warn!(name, error = %e, "failed to remove partial cache file");
        }
    }
    result
}

fn download_into(
    ctx: &CacheContext,
    key: &str,
    name: &str,
    file: &mut LocalWrite,
) -> StreamResult<()> {
    let downloaded = if ctx.should_compress(name) {
        let mut inflater = codec::inflater(&mut *file);
        let n = ctx.blob().download(key, &mut inflater)?;
        inflater.finish()?;
        n
    } else {
        ctx.blob().download(key, &mut *file)?
    };
    file.flush()?;
    debug!(key, name, downloaded, "filled cache file");
    Ok(())
}

impl Read for CacheInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.file.read(buf)?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for CacheInput {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.pos = self.file.seek(pos)?;
        Ok(self.pos)
    }
}

impl IndexInput for CacheInput {
    fn name(&self) -> &str {
        &self.name
    }

    fn length(&self) -> u64 {
        self.length
    }

    fn file_pointer(&self) -> u64 {
        self.pos
    }

    fn try_clone(&self) -> StreamResult<Box<dyn IndexInput>> {
        let mut clone = Self::open_local(Arc::clone(&self.local), &self.name)?;
        clone.seek(SeekFrom::Start(self.pos))?;
        Ok(Box::new(clone))
    }
}

impl std::fmt::Debug for CacheInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheInput")
            .field("name", &self.name)
            .field("length", &self.length)
            .field("pos", &self.pos)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::CACHED_LENGTH;
    use crate::test_support::cache_context;
    use crate::writer::BlobOutput;
    use crate::IndexOutput;
    use blobdir_store::BlobStore;
    use proptest::prelude::*;

    fn read_all(input: &mut CacheInput) -> Vec<u8> {
        let mut out = Vec::new();
        input.read_to_end(&mut out).unwrap();
        out
    }

    fn write_blob(ctx: &Arc<CacheContext>, name: &str, data: &[u8]) {
        let mut out = BlobOutput::create(Arc::clone(ctx), name).unwrap();
        out.write_all(data).unwrap();
        out.close().unwrap();
    }

    #[test]
    fn fetch_downloads_missing_cache_file() {
        let (_dir, blob, ctx) = cache_context(true);
        write_blob(&ctx, "segments_3", b"commit point");
        ctx.local().delete("segments_3").unwrap();

        let props = blob.properties("idx/segments_3").unwrap();
        let mut input = CacheInput::fetch(&ctx, "segments_3", &props).unwrap();
        assert_eq!(input.length(), 12);
        assert_eq!(read_all(&mut input), b"commit point");
        assert_eq!(input.file_pointer(), 12);
    }

    #[test]
    fn fetch_inflates_compressed_objects() {
        let (_dir, blob, ctx) = cache_context(true);
        let data: Vec<u8> = (0..20_000u32).map(|i| (i % 13) as u8).collect();
        write_blob(&ctx, "_4.fdt", &data);
        ctx.local().delete("_4.fdt").unwrap();

        let props = blob.properties("idx/_4.fdt").unwrap();
        assert!(props.content_length < data.len() as u64);
        let mut input = CacheInput::fetch(&ctx, "_4.fdt", &props).unwrap();
        assert_eq!(input.length(), data.len() as u64);
        assert_eq!(read_all(&mut input), data);
    }

    #[test]
    fn stale_cache_copy_is_replaced() {
        let (_dir, blob, ctx) = cache_context(false);
        write_blob(&ctx, "_5.nrm", b"fresh norms");
        {
            let mut stale = ctx.local().create("_5.nrm").unwrap();
            stale.write_all(b"old").unwrap();
        }
        let props = blob.properties("idx/_5.nrm").unwrap();
        let mut input = CacheInput::fetch(&ctx, "_5.nrm", &props).unwrap();
        assert_eq!(read_all(&mut input), b"fresh norms");
    }

    #[test]
    fn current_cache_copy_is_used_without_download() {
        let (_dir, blob, ctx) = cache_context(false);
        write_blob(&ctx, "segments.gen", b"gen");
        let props = blob.properties("idx/segments.gen").unwrap();
        // Remove the remote bytes; a download attempt would now fail.
        blob.delete("idx/segments.gen").unwrap();
        let mut input = CacheInput::fetch(&ctx, "segments.gen", &props).unwrap();
        assert_eq!(read_all(&mut input), b"gen");
    }

    #[test]
    fn missing_object_fails_and_leaves_no_partial_file() {
        let (_dir, blob, ctx) = cache_context(false);
        blob.upload_bytes("idx/ghost", b"boo").unwrap();
        let props = blob.properties("idx/ghost").unwrap();
        blob.delete("idx/ghost").unwrap();

        let err = CacheInput::fetch(&ctx, "ghost", &props).unwrap_err();
        assert!(matches!(err, crate::StreamError::Store(ref e) if e.is_not_found()));
        assert!(!ctx.local().exists("ghost").unwrap());
        assert!(!ctx.guards().is_held("ghost"));
    }

    #[test]
    fn object_without_metadata_uses_content_length() {
        let (_dir, blob, ctx) = cache_context(true);
        blob.upload_bytes("idx/raw", b"no metadata").unwrap();
        let props = blob.properties("idx/raw").unwrap();
        assert!(!props.metadata.contains_key(CACHED_LENGTH));
        let mut input = CacheInput::fetch(&ctx, "raw", &props).unwrap();
        assert_eq!(read_all(&mut input), b"no metadata");
    }

    #[test]
    fn stale_refill_refuses_while_input_open() {
        let (_dir, blob, ctx) = cache_context(false);
        write_blob(&ctx, "_8.tvf", b"0123456789ABCDEF");
        let mut reader = CacheInput::open_local(Arc::clone(ctx.local()), "_8.tvf").unwrap();
        let mut head = [0u8; 4];
        reader.read_exact(&mut head).unwrap();

        // A newer remote version makes the cache copy stale.
        blob.upload_bytes("idx/_8.tvf", b"newer").unwrap();
        let props = blob.properties("idx/_8.tvf").unwrap();
        assert!(CacheInput::fetch(&ctx, "_8.tvf", &props).is_err());
        assert_eq!(ctx.local().length("_8.tvf").unwrap(), 16);
        assert!(!ctx.guards().is_held("_8.tvf"));

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"456789ABCDEF");
        assert_eq!(reader.length(), 16);

        drop(reader);
        let mut fresh = CacheInput::fetch(&ctx, "_8.tvf", &props).unwrap();
        assert_eq!(read_all(&mut fresh), b"newer");
    }

    #[test]
    fn seek_and_clone_track_position() {
        let (_dir, _blob, ctx) = cache_context(false);
        write_blob(&ctx, "_6.tii", b"0123456789");
        let mut input = CacheInput::open_local(Arc::clone(ctx.local()), "_6.tii").unwrap();
        input.seek(SeekFrom::Start(4)).unwrap();
        assert_eq!(input.file_pointer(), 4);

        let mut clone = input.try_clone().unwrap();
        assert_eq!(clone.file_pointer(), 4);
        let mut buf = [0u8; 3];
        clone.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"456");
        assert_eq!(input.file_pointer(), 4);

        input.seek(SeekFrom::End(-1)).unwrap();
        assert_eq!(read_all(&mut input), b"9");
    }

    #[test]
    fn open_input_blocks_cache_delete() {
        let (_dir, _blob, ctx) = cache_context(false);
        write_blob(&ctx, "_7.tvx", b"vectors");
        let input = CacheInput::open_local(Arc::clone(ctx.local()), "_7.tvx").unwrap();
        assert!(ctx.local().delete("_7.tvx").is_err());
        drop(input);
        assert!(ctx.local().delete("_7.tvx").unwrap());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn written_bytes_read_back_after_cache_loss(
            data in proptest::collection::vec(any::<u8>(), 0..4096),
            compress in any::<bool>(),
            ext in prop::sample::select(vec!["cfs", "tvf", "del", "gen"]),
        ) {
            let (_dir, blob, ctx) = cache_context(compress);
            let name = format!("_9.{ext}");
            write_blob(&ctx, &name, &data);
            ctx.local().delete(&name).unwrap();

            let props = blob.properties(&ctx.key(&name)).unwrap();
            let mut input = CacheInput::fetch(&ctx, &name, &props).unwrap();
            prop_assert_eq!(input.length(), data.len() as u64);
            prop_assert_eq!(read_all(&mut input), data);
        }
    }
}
