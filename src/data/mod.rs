//! Data layer: typed values, hierarchical index, event queue
//!
//! Prinsip desain:
//! - Strict typing: tipe sebuah nama tetap sejak dibuat
//! - Self-describing text form: `<name type="T">value</name>`
//! - Total order untuk event: (microseconds, disambiguator)

mod index;
pub mod markup;
mod queue;
mod value;

pub use index::{DataIndex, Entry, DEFAULT_INDEX_NAME, ROOT_NAMESPACE, SEPARATOR_ATTRIBUTE};
pub use queue::{EventQueue, Payload, Timestamp};
pub use value::{infer_type, Value, ValueType, DEFAULT_SEPARATOR};
