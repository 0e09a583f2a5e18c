//! Console output
//!
//! The daemon has no interactive interface; this module only prints the
//! startup banner:
//! - `banner` - Title bar and configuration summary
//! - `utils` - Shared utilities

mod banner;
mod utils;

pub use banner::print_banner;
