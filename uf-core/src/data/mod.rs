//! Data types shared by the DSP engine and the dispatcher

mod buffer;

pub use buffer::DataBuffer;
pub use uf_protocol::{DataType, PrimitiveOpcode};
