pub mod list;
pub mod node;

pub use list::{EntryIter, SkipList};
pub use node::{NO_RECORD, SkipNode};
