//! Streams between the local cache and the remote blob store.
//!
//! A [`BlobOutput`] writes into a cache file and, on close, uploads it to the
//! remote store with its original length and modification time as metadata.
//! Index-segment files are deflated on the way up when compression is
//! enabled. A [`CacheInput`] reads from the cache after [`CacheInput::fetch`]
//! has brought the cache copy up to date, inflating on the way down.
//!
//! Both stream kinds track a CRC-32 or a file pointer locally; neither talks
//! to the remote store while bytes are being written or read.

pub mod checksum;
pub mod codec;
pub mod context;
pub mod error;
pub mod guard;
pub mod metadata;
pub mod reader;
pub mod traits;
pub mod writer;

pub use checksum::ChecksumWriter;
pub use context::CacheContext;
pub use error::{StreamError, StreamResult};
pub use guard::{NameGuard, NameGuards};
pub use metadata::{CacheMetadata, CACHED_LAST_MODIFIED, CACHED_LENGTH};
pub use reader::CacheInput;
pub use traits::{IndexInput, IndexOutput};
pub use writer::{BlobOutput, LocalOutput};
