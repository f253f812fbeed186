pub mod authoring;
pub mod config;
pub mod document;
pub mod error;
pub mod grading;
pub mod insights;
pub mod interchange;
pub mod models;
pub mod reducer;
pub mod routes;
pub mod storage;
pub mod store;
pub mod util;

pub use document::Document;
pub use reducer::Action;
pub use store::Store;
