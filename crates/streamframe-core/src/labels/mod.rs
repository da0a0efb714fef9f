//! Label sets and the index routing them to derived fields.
//!
//! Rows tagged with labels are split into one field per distinct label set.
//! The label key is the canonical, order-independent identity of a set.

mod index;
mod key;

pub use index::{LabelIndex, LabelSlot, Resolved};
pub use key::{parse_labels, LabelKey, Labels};
