// Utils compartidos

pub mod storage;
pub mod sw_ffi;

pub use storage::*;
pub use sw_ffi::*;
