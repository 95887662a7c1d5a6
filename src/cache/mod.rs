//! In-process content cache.
//!
//! Each persisted collection (gallery, materials, site config) is held as a
//! whole document in memory. Reads are served from memory after the first
//! load; writes replace the document on disk and then in memory, one writer
//! per collection at a time. There is no expiry and no external
//! invalidation: edits made to the JSON files by other processes are not
//! observed until this process overwrites them.

pub(crate) mod collection;
mod lock;
mod store;

pub use collection::CachedCollection;
pub use store::{ContentCache, GalleryDocument, MaterialsDocument, WarmupReport};
