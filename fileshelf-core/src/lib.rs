mod client;

pub use client::{ApiErrorClass, DeleteAck, FileRecord, FileServerClient, FileServerError};
