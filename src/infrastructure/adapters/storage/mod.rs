//! Storage Adapter - 远端对象存储上传

mod http_uploader;

pub use http_uploader::{HttpObjectUploader, HttpObjectUploaderConfig};
