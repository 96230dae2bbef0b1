// Utility module - shared byte-level helpers used by the wire codec.

pub mod byte_buffer;

pub use byte_buffer::ByteBuffer;
