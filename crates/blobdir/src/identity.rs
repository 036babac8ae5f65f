use std::fmt;

use crate::error::{DirectoryError, DirectoryResult};

/// Where a directory lives: a container plus a key prefix inside it.
///
/// The container name is trimmed and lower-cased. The root prefix uses `/`
/// separators, has no leading separator, and ends with exactly one `/`
/// unless it is empty (the container root).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DirectoryIdentity {
    container: String,
    root_prefix: String,
}

impl DirectoryIdentity {
    pub fn new(container: &str, root_prefix: Option<&str>) -> DirectoryResult<Self> {
        let container = container.trim().to_lowercase();
        if container.is_empty() {
            return Err(DirectoryError::InvalidIdentity(
                "container name must not be empty".into(),
            ));
        }
        Ok(Self {
            container,
            root_prefix: normalize_prefix(root_prefix.unwrap_or_default()),
        })
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn root_prefix(&self) -> &str {
        &self.root_prefix
    }

    /// Remote key of `name` in this directory.
    pub fn key(&self, name: &str) -> String {
        format!("{}{name}", self.root_prefix)
    }
}

fn normalize_prefix(raw: &str) -> String {
    let prefix = raw.replace('\\', "/");
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        String::new()
    } else {
        format!("{prefix}/")
    }
}

impl fmt::Display for DirectoryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.root_prefix)
    }
}
