//! Export of LCF data to generic value trees.
//!
//! [`to_json`] walks a file, element, record or table and decodes every
//! reachable chunk. The result owns its data and can outlive the file.
//! Serialize it with `serde_json` through `serde_json::Value::from`.

mod json;

pub use json::{to_json, ToValue, REST_KEY};
