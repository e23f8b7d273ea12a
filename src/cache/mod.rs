//! Derived-artifact caches
//!
//! Avoids repeating expensive data tool work for files that have not
//! changed. Two caches share one persistence and eviction design:
//!
//! - the conversion cache maps a spreadsheet or JSON-lines source to the CSV
//!   artifact produced from it
//! - the profile cache maps a source plus request options to profile text
//!
//! # Persistence
//!
//! Each cache keeps a single JSON document in the working directory. The
//! document is loaded whole, mutated, and written back via temp file and
//! atomic rename. There is no locking: concurrent writers are
//! last-writer-wins at document granularity.
//!
//! # Validity
//!
//! | Cache | Entry invalid when |
//! |-------|--------------------|
//! | Conversion | source mtime is newer than the artifact mtime, or the artifact is gone |
//! | Profile | source size or mtime differs from the snapshot, or age exceeds the TTL |
//!
//! Neither cache ever fails its caller. Internal errors are logged and
//! surface as a miss or a no-op.

pub mod conversion;
pub mod eviction;
pub mod profile;
pub mod staleness;
pub mod store;

pub use conversion::{
    ConversionCache, ConversionEntry, OrphanCleanup, CONVERTED_CACHE_FILE, STALE_TEMP_AGE,
};
pub use profile::{
    ProfileCache, ProfileCacheMetrics, ProfileCleanup, ProfileEntry, ProfileOptions,
    PROFILE_CACHE_FILE,
};
pub use staleness::SourceStat;
pub use store::{CacheDocument, CacheEntry, DocumentStore, DOCUMENT_VERSION};
