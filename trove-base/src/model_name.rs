use std::borrow::{Borrow, Cow};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Case-normalized logical name of a model, used as the cache key. "ArmCom.S3O", " armcom.s3o"
/// and "armcom.s3o" are the same name. Backslashes are turned into forward slashes so that names
/// derived from windows paths match names typed by hand.
///
/// Hashes and compares exactly like the normalized `str`, so maps keyed by `ModelName` can be
/// queried with a `&str` without allocating.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelName(Arc<str>);

impl ModelName {
    pub fn new(name: &str) -> Self {
        ModelName(Arc::from(Self::normalize(name).as_ref()))
    }

    /// Builds the name a resolved file path is cached under
    pub fn from_path(path: &Path) -> Self {
        Self::new(&path.to_string_lossy())
    }

    /// Returns the normalized form of `name`, only allocating if it is not already normalized
    pub fn normalize(name: &str) -> Cow<'_, str> {
        let trimmed = name.trim();
        if trimmed.chars().any(|c| c.is_uppercase() || c == '\\') {
            Cow::Owned(trimmed.replace('\\', "/").to_lowercase())
        } else {
            Cow::Borrowed(trimmed)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The extension of the last path segment, if it has one ("units/armcom.s3o" -> "s3o")
    pub fn extension(&self) -> Option<&str> {
        let file_name = self.0.rsplit('/').next().unwrap_or(self.as_str());
        match file_name.rfind('.') {
            Some(0) | None => None,
            Some(index) => Some(&file_name[index + 1..]).filter(|x| !x.is_empty()),
        }
    }
}

impl fmt::Debug for ModelName {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_tuple("ModelName").field(&&*self.0).finish()
    }
}

impl fmt::Display for ModelName {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ModelName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ModelName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModelName {
    fn from(name: &str) -> Self {
        ModelName::new(name)
    }
}

impl From<String> for ModelName {
    fn from(name: String) -> Self {
        ModelName::new(&name)
    }
}

/// Identifies a loaded model within a loader session. Assigned in load order starting at 0 and
/// never reused until the loader is killed.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct ModelId(pub u32);

impl ModelId {
    /// Id carried by a model that has not been inserted into a cache yet
    pub const INVALID: ModelId = ModelId(u32::MAX);

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ModelId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        self.0.fmt(f)
    }
}
