mod model_name;
pub use model_name::{ModelId, ModelName};

pub mod model;
pub use model::{Model, ModelFormat, ModelPiece};

/// Default hashmap for trove. Keys are asset names and extensions, so the cheaper ahash hasher is
/// used instead of the default SipHash.
pub type HashMap<K, V> = std::collections::HashMap<K, V, ahash::RandomState>;
/// Default hashset for trove.
pub type HashSet<T> = std::collections::HashSet<T, ahash::RandomState>;
