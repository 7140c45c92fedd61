use crate::error::ParseError;
use std::path::Path;
use std::sync::Arc;
use trove_base::{HashMap, Model, ModelFormat};

/// Turns a file of one particular format into a [`Model`].
///
/// Parsers are shared between the load queue's worker thread and any thread calling
/// [`ModelLoader::load_model`](crate::ModelLoader::load_model), so `parse` may run concurrently
/// with itself for different paths. Implementations must not rely on `&mut` state; anything they
/// cache internally has to be synchronized.
pub trait ModelParser: Send + Sync {
    fn parse(
        &self,
        path: &Path,
    ) -> Result<Model, ParseError>;
}

/// Maps file extensions to formats and formats to parsers. Filled in before the loader is
/// initialized and read-only after that.
#[derive(Default)]
pub struct ParserRegistry {
    // "s3o" -> ModelFormat::S3o
    formats: HashMap<String, ModelFormat>,
    // ModelFormat::S3o -> parser
    parsers: HashMap<ModelFormat, Arc<dyn ModelParser>>,
    // Extensions in the order they were registered. This is the order the path resolver tries
    // them in when a name has no extension.
    extensions: Vec<String>,
}

impl ParserRegistry {
    /// Registers `parser` for `format` under the format's default extensions
    pub fn register(
        &mut self,
        format: ModelFormat,
        parser: Arc<dyn ModelParser>,
    ) {
        self.register_with_extensions(format, format.default_extensions(), parser);
    }

    pub fn register_with_extensions(
        &mut self,
        format: ModelFormat,
        extensions: &[&str],
        parser: Arc<dyn ModelParser>,
    ) {
        log::debug!(
            "Register {} parser for extensions {:?}",
            format.name(),
            extensions
        );

        let old = self.parsers.insert(format, parser);
        assert!(
            old.is_none(),
            "A parser for format {} was already registered",
            format.name()
        );

        for extension in extensions {
            let extension = extension.trim_start_matches('.').to_lowercase();
            let old = self.formats.insert(extension.clone(), format);
            assert!(
                old.is_none(),
                "Extension {:?} was already registered",
                extension
            );
            self.extensions.push(extension);
        }
    }

    /// Finds the parser for a file extension. Matching is case-insensitive and a leading '.' is
    /// ignored.
    pub fn lookup(
        &self,
        extension: &str,
    ) -> Option<(ModelFormat, &Arc<dyn ModelParser>)> {
        let extension = extension.trim_start_matches('.');
        let format = match self.formats.get(extension) {
            Some(format) => *format,
            None => *self.formats.get(&extension.to_lowercase())?,
        };

        let parser = self.parsers.get(&format)?;
        Some((format, parser))
    }

    pub fn format_for_extension(
        &self,
        extension: &str,
    ) -> Option<ModelFormat> {
        self.lookup(extension).map(|(format, _)| format)
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Number of registered parsers
    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    pub fn clear(&mut self) {
        self.formats.clear();
        self.parsers.clear();
        self.extensions.clear();
    }
}
