use std::path::{Component, Path, PathBuf};

/// Turns a logical model name into the file it should be loaded from.
///
/// `name` is the name as the caller wrote it (trimmed), not the lower-cased cache key, so
/// resolvers backed by a case-sensitive file system can still find it.
///
/// `extensions` are the lower-case extensions that have a registered parser, in registration
/// order. Implementations may use them to find files for names given without an extension.
/// Resolution must not depend on loader state and may be called from any thread.
pub trait ModelPathResolver: Send + Sync {
    fn resolve(
        &self,
        name: &str,
        extensions: &[String],
    ) -> Option<PathBuf>;
}

/// Looks for models in a list of directories, first match wins. A file whose name only differs in
/// ASCII case from the requested one is also a match.
#[derive(Debug, Clone, Default)]
pub struct SearchPathResolver {
    search_paths: Vec<PathBuf>,
}

impl SearchPathResolver {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        SearchPathResolver { search_paths }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    fn find_file(
        &self,
        relative_path: &Path,
    ) -> Option<PathBuf> {
        self.search_paths.iter().find_map(|search_path| {
            let candidate = search_path.join(relative_path);
            if candidate.is_file() {
                Some(candidate)
            } else if relative_path.is_relative() {
                find_file_ignoring_case(search_path, relative_path)
            } else {
                None
            }
        })
    }
}

// Walks `relative_path` below `dir` one component at a time, matching each against the directory
// entries without regard to ASCII case. Returns the path with the case found on disk.
fn find_file_ignoring_case(
    dir: &Path,
    relative_path: &Path,
) -> Option<PathBuf> {
    let mut current = dir.to_path_buf();
    for component in relative_path.components() {
        let wanted = match component {
            Component::Normal(wanted) => wanted.to_str()?,
            Component::CurDir => continue,
            _ => return None,
        };

        let exact = current.join(wanted);
        if exact.exists() {
            current = exact;
            continue;
        }

        let entry = std::fs::read_dir(&current)
            .ok()?
            .filter_map(|entry| entry.ok())
            .find(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .map_or(false, |file_name| file_name.eq_ignore_ascii_case(wanted))
            })?;
        current = entry.path();
    }

    Some(current).filter(|path| path.is_file())
}

impl ModelPathResolver for SearchPathResolver {
    fn resolve(
        &self,
        name: &str,
        extensions: &[String],
    ) -> Option<PathBuf> {
        if name.is_empty() {
            return None;
        }

        let name_path = Path::new(name);
        if name_path.extension().is_some() {
            if let Some(path) = self.find_file(name_path) {
                return Some(path);
            }

            // Also accept a path that was already resolved, i.e. an alias
            return Some(name_path.to_path_buf()).filter(|path| path.is_file());
        }

        for extension in extensions {
            let with_extension = name_path.with_extension(extension);
            if let Some(path) = self.find_file(&with_extension) {
                return Some(path);
            }
        }

        log::trace!(
            "{:?} not found in {:?} with any of {:?}",
            name,
            self.search_paths,
            extensions
        );
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"").unwrap();
    }

    #[test]
    fn resolves_names_with_extension() {
        let dir = tempfile::tempdir().unwrap();
        let objects = dir.path().join("objects3d");
        touch(&objects.join("armcom.s3o"));

        let resolver = SearchPathResolver::new(vec![dir.path().join("missing"), objects.clone()]);
        assert_eq!(
            resolver.resolve("armcom.s3o", &[]),
            Some(objects.join("armcom.s3o"))
        );
        assert_eq!(resolver.resolve("corcom.s3o", &[]), None);
    }

    #[test]
    fn tries_registered_extensions_in_order() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("armflash.3do"));
        touch(&dir.path().join("armflash.s3o"));

        let resolver = SearchPathResolver::new(vec![dir.path().to_path_buf()]);
        let extensions = vec!["s3o".to_string(), "3do".to_string()];
        assert_eq!(
            resolver.resolve("armflash", &extensions),
            Some(dir.path().join("armflash.s3o"))
        );

        let extensions = vec!["3do".to_string(), "s3o".to_string()];
        assert_eq!(
            resolver.resolve("armflash", &extensions),
            Some(dir.path().join("armflash.3do"))
        );

        assert_eq!(resolver.resolve("armflash", &[]), None);
    }

    #[test]
    fn matches_file_names_ignoring_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Units").join("ArmCom.obj");
        touch(&path);

        let resolver = SearchPathResolver::new(vec![dir.path().to_path_buf()]);
        let extensions = vec!["obj".to_string()];
        assert_eq!(resolver.resolve("Units/ArmCom", &extensions), Some(path.clone()));
        assert_eq!(resolver.resolve("units/armcom", &extensions), Some(path.clone()));
        assert_eq!(resolver.resolve("UNITS/ARMCOM.OBJ", &[]), Some(path.clone()));
        assert_eq!(resolver.resolve("units/armflash", &extensions), None);
    }

    #[test]
    fn accepts_already_resolved_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("units").join("unit_a.obj");
        touch(&path);

        let resolver = SearchPathResolver::new(vec![]);
        assert_eq!(
            resolver.resolve(path.to_str().unwrap(), &[]),
            Some(path.clone())
        );
    }
}
