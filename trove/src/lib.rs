#[cfg(feature = "trove-base")]
pub use trove_base as base;

#[cfg(feature = "trove-loader")]
pub use trove_loader as loader;
