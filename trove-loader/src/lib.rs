// Loading pipeline for a single model request:
//
// (name) -> cache hit? -> (shared Model)
//             | miss
//             v
//   claim name as in-flight -> resolve path -> parser by extension -> parse (no lock held)
//             -> insert into cache (under lock, no-op if someone else won) -> release claim
//
// Preloads go through a FIFO drained by one worker thread that runs the same routine, so the
// cache is the only place a model is ever stored. The cache, the in-flight set and the queue's
// critical sections all share one mutex, so there is no lock ordering to get wrong.

pub mod cache;
pub mod config;
mod error;
pub mod load_queue;
pub mod loader;
pub mod parser;
pub mod resolver;

pub use cache::{CachedModel, ModelCache};
pub use config::ModelLoaderConfiguration;
pub use error::{LoadError, LoadResult, ParseError};
pub use load_queue::{LoadQueue, LoadQueueState};
pub use loader::{LoadState, ModelLoader, PostLoadHook};
pub use parser::{ModelParser, ParserRegistry};
pub use resolver::{ModelPathResolver, SearchPathResolver};

pub use trove_base::{Model, ModelFormat, ModelId, ModelName, ModelPiece};
