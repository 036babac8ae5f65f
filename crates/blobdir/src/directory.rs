use std::io;
use std::sync::Arc;

use blobdir_lock::Lock;
use blobdir_stream::{IndexInput, IndexOutput};

use crate::error::DirectoryResult;

/// A flat namespace of index files.
///
/// Implementations must be shareable across threads; every operation takes
/// `&self`.
pub trait Directory: Send + Sync {
    /// Names of all files currently in the directory.
    fn list_all(&self) -> DirectoryResult<Vec<String>>;

    /// Whether `name` exists. Lookup failures report `false`.
    fn file_exists(&self, name: &str) -> bool;

    /// Length of `name` in bytes. Lookup failures report 0.
    fn file_length(&self, name: &str) -> u64;

    /// Delete `name`. Deleting a missing file is not an error.
    fn delete_file(&self, name: &str) -> DirectoryResult<()>;

    /// Create (or replace) `name` for writing.
    fn create_output(&self, name: &str) -> DirectoryResult<Box<dyn IndexOutput>>;

    /// Open `name` for reading.
    fn open_input(&self, name: &str) -> DirectoryResult<Box<dyn IndexInput>>;

    /// The lock registered under `name`; repeated calls return the same
    /// instance.
    fn make_lock(&self, name: &str) -> Arc<dyn Lock>;

    /// Forcibly release `name` regardless of who holds it.
    fn clear_lock(&self, name: &str) -> DirectoryResult<()>;

    /// Make `names` durable. Outputs are durable once closed, so this does
    /// nothing by default.
    fn sync(&self, _names: &[&str]) -> DirectoryResult<()> {
        Ok(())
    }

    /// Copy `src` from this directory into `target` as `dest`.
    fn copy(&self, target: &dyn Directory, src: &str, dest: &str) -> DirectoryResult<()> {
        let mut input = self.open_input(src)?;
        let mut output = target.create_output(dest)?;
        io::copy(&mut input, &mut output)?;
        output.close()?;
        Ok(())
    }
}
