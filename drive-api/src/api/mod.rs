pub mod files;
pub mod storage;

pub use files::FilesApi;
pub use storage::StorageApi;
