pub mod mux;
pub mod s3;
pub mod storage;
pub mod surveys;
pub mod upload;
pub mod videos;
pub mod webhook;
