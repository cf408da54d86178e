pub mod interactor;

pub use interactor::{IdentifierStrategy, RecordInteractor};
