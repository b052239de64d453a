//! Operations a front end invokes.
//!
//! - [`convert_files`]: Read, admit and convert a set of files
//! - [`export_entry`]: Save one converted image
//! - [`export_results`]: Save every converted image, individually or as a ZIP

mod convert;

pub use convert::*;
