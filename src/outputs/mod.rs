//! Where finished drafts go.
//!
//! # Submodules
//!
//! - [`json`]: Saves drafts as JSON files and lists them back
//! - [`email`]: Emails a copy-paste friendly rendering of a draft
//! - [`thumbnail`]: Builds thumbnail image URLs and downloads images
//!
//! # Output Structure
//!
//! ```text
//! data_dir/
//! ├── articles/
//! │   └── 20261017_083015_a1b2c3.json
//! ├── cache/
//! │   └── 3f9a1c0b7d2e.json
//! └── thumbnails/
//!     └── 20261017_083015_a1b2c3.png
//! ```

pub mod email;
pub mod json;
pub mod thumbnail;
