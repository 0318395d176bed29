//! LCF - reading, converting and writing LCF game data files.
//!
//! This crate provides a unified interface to the LCF crates.
//!
//! # Crates
//!
//! - [`lcf_common`] - Common utilities (binary reading, BER varints, codepages)
//! - [`lcf_codec`] - Schema registry, lazy views, JSON bridge and save engine
//!
//! # Example
//!
//! ```no_run
//! use lcf::prelude::*;
//!
//! // Strings in this game are stored as CP1252
//! set_codepage("1252")?;
//!
//! let file = LcfFile::open("RPG_RT.lmt")?;
//! let maps = file.root(0).expect("map table").a2d()?;
//! for map in &maps {
//!     println!("{}: {}", map.index(), map.field("name")?.s()?);
//! }
//!
//! let value = to_json(&file)?;
//! let bytes = to_bytes(&value)?;
//! std::fs::write("RPG_RT.copy.lmt", bytes)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Re-export all sub-crates
pub use lcf_codec as codec;
pub use lcf_common as common;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use lcf_codec::{
        open, save_lcf, to_bytes, to_json, Array1d, Array2d, DataType, Element, Event,
        EventCommand, LcfFile, MapTree, Value,
    };
    pub use lcf_common::{codepage, set_codepage};
}

// Re-export commonly used types at the crate root
pub use lcf_codec::{open, to_json, LcfFile, Value};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
