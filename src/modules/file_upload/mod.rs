pub mod handle;
pub mod model;
pub mod route;
pub mod schema;
pub mod service;

pub use model::UploadConfig;
pub use schema::{FileMeta, UploadedFile};
pub use service::{FileStorage, LocalFileStorage};
