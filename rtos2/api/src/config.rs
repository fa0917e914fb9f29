//! Layer configuration.

use alloc::vec::Vec;

use rtos2_core::{HeapRegion, Version};

/// Start address of the default heap region
pub const DEFAULT_HEAP_START: usize = 0x1000_0000;

/// Size of the default heap region in bytes
pub const DEFAULT_HEAP_SIZE: usize = 32 * 1024;

/// Configuration of the compatibility layer.
///
/// Heap regions are registered with the native kernel by
/// [`Kernel::initialize`](crate::kernel::Kernel::initialize) when the port
/// supports dynamic allocation.
#[derive(Debug, Clone)]
pub struct OsConfig {
    pub api_version: Version,
    pub heap_regions: Vec<HeapRegion>,
}

impl Default for OsConfig {
    fn default() -> Self {
        Self {
            api_version: Version::new(0, 0, 1),
            heap_regions: alloc::vec![HeapRegion {
                start: DEFAULT_HEAP_START,
                size: DEFAULT_HEAP_SIZE,
            }],
        }
    }
}

impl OsConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> OsConfigBuilder {
        OsConfigBuilder::default()
    }
}

/// Builder for ergonomic layer configuration.
#[derive(Debug, Clone, Default)]
pub struct OsConfigBuilder {
    config: OsConfig,
}

impl OsConfigBuilder {
    /// Sets the API version reported by `get_info`.
    pub fn api_version(mut self, version: Version) -> Self {
        self.config.api_version = version;
        self
    }

    /// Replaces the heap with a single region of `size` bytes.
    pub fn heap_size(mut self, size: usize) -> Self {
        self.config.heap_regions = alloc::vec![HeapRegion {
            start: DEFAULT_HEAP_START,
            size,
        }];
        self
    }

    /// Replaces the heap regions.
    pub fn heap_regions(mut self, regions: &[HeapRegion]) -> Self {
        self.config.heap_regions = regions.to_vec();
        self
    }

    pub fn build(self) -> OsConfig {
        self.config
    }
}
