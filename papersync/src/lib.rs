pub mod config;
pub mod paths;
pub mod session;
pub mod source;
pub mod storage;
pub mod sync;
