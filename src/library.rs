//! Local audio library: scanning a directory tree into `Track` values.
//!
//! `LocalLibrary` is the data provider the app model loads its track list
//! from; `scan` does the blocking filesystem and tag work.

mod display;
mod model;
mod scan;
mod source;

pub use display::display_from_fields;
pub use model::Track;
pub use scan::scan;
pub use source::{LibraryError, LocalLibrary, TrackSource};
