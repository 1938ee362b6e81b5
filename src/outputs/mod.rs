//! Output generation for normalized coupons.
//!
//! # Submodules
//!
//! - [`json`]: Writes one JSON array of coupons per merchant domain
//!
//! # Output Structure
//!
//! ```text
//! coupons_data/
//! ├── example.com.json
//! ├── example.co.uk.json
//! └── ...
//! ```
//!
//! Each run overwrites files for the merchants it reaches and leaves every
//! other file untouched.

pub mod json;
