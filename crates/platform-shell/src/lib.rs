//! Resolve Bridge OS integration
//!
//! Platform-specific shell actions:
//! - **macOS:** `open -R` selects the file in Finder
//! - **Windows:** `explorer /select,` selects the file in Explorer
//! - **Other:** `xdg-open` on the containing directory

pub mod reveal;

pub use reveal::*;
