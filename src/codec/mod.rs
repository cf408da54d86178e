pub mod stream;
pub mod tags;
pub mod value;

pub use stream::{from_buffer, read_attribute, to_buffer};
pub use tags::TypeTag;
pub use value::{Streamable, Value};
