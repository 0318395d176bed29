//! Schema-driven codec for LCF game data files.
//!
//! LCF files (`RPG_RT.ldb`, `RPG_RT.lmt`, `Map*.lmu`, `Save*.lsd`) are
//! sparse, self-describing chunk trees. This crate reads them lazily against
//! embedded schema documents, converts them into generic [`Value`] trees, and
//! writes value trees back into byte-exact binary.
//!
//! # Quick Start
//!
//! ```no_run
//! use lcf_codec::{to_json, LcfFile};
//!
//! let file = LcfFile::open("Map0001.lmu")?;
//! if !file.valid() {
//!     eprintln!("not an LCF file: {}", file.error());
//!     return Ok(());
//! }
//!
//! // Typed access decodes only what is touched
//! let width = file.field("width")?.i()?;
//! let events = file.field("events")?.a2d()?;
//! println!("{} columns, {} events", width, events.len());
//!
//! // Or materialize the whole file
//! let value = to_json(&file)?;
//! println!("{}", value);
//! # Ok::<(), lcf_codec::Error>(())
//! ```
//!
//! # Saving
//!
//! ```no_run
//! use lcf_codec::{save_lcf, to_json, LcfFile};
//!
//! let file = LcfFile::open("RPG_RT.ldb")?;
//! let value = to_json(&file)?;
//!
//! let mut out = std::fs::File::create("RPG_RT.copy.ldb")?;
//! save_lcf(&value, &mut out)?;
//! # Ok::<(), lcf_codec::Error>(())
//! ```
//!
//! # Architecture
//!
//! - **Schema** (`schema`): embedded documents describing every record type
//! - **Element** (`Element`): a lazy view of one chunk with typed getters
//! - **Records and tables** (`Array1d`, `Array2d`): sparse indexed containers
//! - **File** (`LcfFile`): signature lookup and root discovery
//! - **Export** (`to_json`) and **save** (`save_lcf`): the two directions of
//!   the value-tree bridge

mod array1d;
mod array2d;
mod element;
mod error;
mod event;
mod file;
mod map_tree;
mod stream;
mod types;
mod value;

pub mod export;
pub mod save;
pub mod schema;

#[cfg(test)]
mod test_support;

pub use array1d::Array1d;
pub use array2d::Array2d;
pub use element::{ArrayItem, Element, IntArray};
pub use error::{Error, Result};
pub use event::{Event, EventCommand};
pub use file::LcfFile;
pub use map_tree::MapTree;
pub use stream::Stream;
pub use types::DataType;
pub use value::{Map, Value};

pub use export::{to_json, ToValue};
pub use save::{calculate_size, save_array1d, save_array2d, save_element, save_lcf, to_bytes};
pub use schema::{get_schema, FieldKey, Schema};

/// Open and parse an LCF file.
pub fn open(path: impl AsRef<std::path::Path>) -> Result<LcfFile> {
    LcfFile::open(path)
}
