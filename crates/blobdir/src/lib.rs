//! Index directories stored in a remote blob store.
//!
//! [`BlobDirectory`] lets a search index treat a container in a remote object
//! store as a flat directory of files. File bytes are mirrored in a local
//! disk cache, segment files are optionally deflated on upload, and index
//! writers on different machines are serialized with lease-based locks.
//! [`FsDirectory`] implements the same [`Directory`] trait over local disk
//! only.
//!
//! # Example
//!
//! ```
//! use std::io::{Read, Write};
//! use std::sync::Arc;
//!
//! use blobdir::{BlobDirectory, Directory, DirectoryIdentity, InMemoryBlobStore};
//! use blobdir::{FsLocalStore, IndexOutput, Lock};
//!
//! let cache = tempfile::tempdir().unwrap();
//! let dir = BlobDirectory::new(
//!     Arc::new(InMemoryBlobStore::new("search")),
//!     Arc::new(FsLocalStore::open(cache.path()).unwrap()),
//!     DirectoryIdentity::new("search", Some("catalog")).unwrap(),
//!     true,
//! );
//!
//! let lock = dir.make_lock("write.lock");
//! assert!(lock.obtain());
//!
//! let mut out = dir.create_output("_0.cfs").unwrap();
//! out.write_all(b"segment").unwrap();
//! out.close().unwrap();
//! lock.release().unwrap();
//!
//! let mut bytes = Vec::new();
//! dir.open_input("_0.cfs").unwrap().read_to_end(&mut bytes).unwrap();
//! assert_eq!(bytes, b"segment");
//! ```

pub mod blob_directory;
pub mod config;
pub mod directory;
pub mod error;
pub mod fs_directory;
pub mod identity;

pub use blob_directory::BlobDirectory;
pub use config::DirectoryConfig;
pub use directory::Directory;
pub use error::{DirectoryError, DirectoryResult};
pub use fs_directory::FsDirectory;
pub use identity::DirectoryIdentity;

pub use blobdir_lock::{Lock, LockRegistry};
pub use blobdir_store::{BlobStore, FsLocalStore, InMemoryBlobStore, LocalStore};
pub use blobdir_stream::{IndexInput, IndexOutput};
