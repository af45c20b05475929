//! Request and response data model.

mod envelope;
mod input_file;
mod payload;

pub use envelope::{ApiResponse, ResponseParameters};
pub use input_file::{ByteSource, ByteStream, InputFile};
pub use payload::{Payload, PayloadValue};
