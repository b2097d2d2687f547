pub mod files;
pub mod storage;

pub use files::*;
pub use storage::*;
