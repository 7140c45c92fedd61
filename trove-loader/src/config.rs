use crate::resolver::SearchPathResolver;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::{Path, PathBuf};

pub const CONFIGURATION_FILE_NAME: &str = "model_loader.json";
pub const DEFAULT_WORKER_THREAD_NAME: &str = "ModelLoadQueue";

#[derive(Serialize, Deserialize)]
pub struct ModelLoaderConfigurationJson {
    pub search_paths: Vec<String>,
    #[serde(default)]
    pub worker_thread_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ModelLoaderConfiguration {
    // Directories searched, in order, when resolving a model name to a file
    pub search_paths: Vec<PathBuf>,

    // Name given to the load queue's background thread
    pub worker_thread_name: String,
}

impl Default for ModelLoaderConfiguration {
    fn default() -> Self {
        ModelLoaderConfiguration {
            search_paths: vec![PathBuf::from("objects3d")],
            worker_thread_name: DEFAULT_WORKER_THREAD_NAME.to_string(),
        }
    }
}

impl ModelLoaderConfiguration {
    pub fn unverified_absolute_path(
        root_path: &Path,
        json_path: &str,
    ) -> PathBuf {
        if Path::new(json_path).is_absolute() {
            PathBuf::from(json_path)
        } else {
            root_path.join(json_path)
        }
    }

    // root_path is the path the json file is in. Search paths that don't exist are kept as-is
    // (they simply never match), existing ones are canonicalized.
    pub fn parse_search_path(
        root_path: &Path,
        json_path: &str,
    ) -> PathBuf {
        let joined_path = Self::unverified_absolute_path(root_path, json_path);
        if joined_path.is_dir() {
            dunce::canonicalize(&joined_path).unwrap_or(joined_path)
        } else {
            log::warn!("Model search path {:?} does not exist", joined_path);
            joined_path
        }
    }

    pub fn read_from_path(path: &Path) -> Result<Self, Box<dyn Error>> {
        let root_path = dunce::canonicalize(
            path.parent()
                .ok_or_else(|| "Parent of configuration file path could not be found".to_string())?,
        )?;
        let file_contents = std::fs::read_to_string(path)?;
        let configuration_file: ModelLoaderConfigurationJson =
            serde_json::from_str(&file_contents)?;

        let search_paths = configuration_file
            .search_paths
            .iter()
            .map(|search_path| Self::parse_search_path(&root_path, search_path))
            .collect();

        Ok(ModelLoaderConfiguration {
            search_paths,
            worker_thread_name: configuration_file
                .worker_thread_name
                .unwrap_or_else(|| DEFAULT_WORKER_THREAD_NAME.to_string()),
        })
    }

    pub fn locate_configuration_file(search_location: &Path) -> Result<Self, Box<dyn Error>> {
        let mut path = Some(search_location.to_path_buf());
        while let Some(p) = path {
            let joined_path = p.join(CONFIGURATION_FILE_NAME);
            if joined_path.exists() {
                log::info!("Using model loader configuration at {:?}", joined_path);
                return Self::read_from_path(&joined_path);
            }

            path = p.parent().map(|x| x.to_path_buf());
        }

        Err(format!(
            "{} could not be located at {:?} or in any of its parent directories",
            CONFIGURATION_FILE_NAME, search_location
        ))?
    }

    pub fn path_resolver(&self) -> SearchPathResolver {
        SearchPathResolver::new(self.search_paths.clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reads_relative_search_paths() {
        let dir = tempfile::tempdir().unwrap();
        let root = dunce::canonicalize(dir.path()).unwrap();
        std::fs::create_dir_all(root.join("objects3d")).unwrap();
        std::fs::write(
            root.join(CONFIGURATION_FILE_NAME),
            r#"{ "search_paths": ["objects3d", "missing"], "worker_thread_name": "Preload" }"#,
        )
        .unwrap();

        let config =
            ModelLoaderConfiguration::read_from_path(&root.join(CONFIGURATION_FILE_NAME)).unwrap();
        assert_eq!(
            config.search_paths,
            vec![root.join("objects3d"), root.join("missing")]
        );
        assert_eq!(config.worker_thread_name, "Preload");
        assert_eq!(config.path_resolver().search_paths().len(), 2);
    }

    #[test]
    fn locates_file_in_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dunce::canonicalize(dir.path()).unwrap();
        let nested = root.join("maps").join("small");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(
            root.join(CONFIGURATION_FILE_NAME),
            r#"{ "search_paths": ["objects3d"] }"#,
        )
        .unwrap();

        let config = ModelLoaderConfiguration::locate_configuration_file(&nested).unwrap();
        assert_eq!(config.search_paths, vec![root.join("objects3d")]);
        assert_eq!(config.worker_thread_name, DEFAULT_WORKER_THREAD_NAME);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIGURATION_FILE_NAME);
        std::fs::write(&path, "{ not json").unwrap();
        assert!(ModelLoaderConfiguration::read_from_path(&path).is_err());
    }
}
