//! Image processing pipeline components.
//!
//! - **decode**: Load and decode images through the [`ImageSource`] seam
//! - **discovery**: Find image files in directories
//! - **cache**: Checksum-keyed reuse of extraction results
//! - **batch**: Parallel, cancellable fingerprint extraction

pub mod batch;
pub mod cache;
pub mod decode;
pub mod discovery;

pub use batch::{
    BatchExtractor, BatchOutcome, CancellationToken, ExtractedImage, ExtractionFailure,
    PhotoRecord,
};
pub use cache::ExtractionCache;
pub use decode::{DecodedImage, FileImageSource, ImageSource};
pub use discovery::{DiscoveredFile, FileDiscovery};
