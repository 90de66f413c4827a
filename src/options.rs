use crate::{strategy::Strategy, version::Version};

/// Encoder options.
#[derive(Clone, Copy, Debug, Default)]
pub struct Options {
    /// Version of the enclosing container format.
    pub version: Version,
    /// Tuner strategy preset.
    pub strategy: Strategy,
    /// Compression level of the enclosing container. Accepted for parity
    /// with the container codec interface; the tuner presently selects
    /// parameters from `strategy` alone.
    pub level: u8,
}
