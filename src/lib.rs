pub mod archive;
pub mod binary;
pub mod catalog;
pub mod download;
pub mod failure;
pub mod http;
pub mod install;
pub mod platform;
pub mod runtime;
pub mod scratch;
pub mod verify;
