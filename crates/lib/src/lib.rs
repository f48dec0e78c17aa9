//! Ragdesk core library: backend gateway, log feed, uploads, workspace sessions and the
//! surfaces composed from them, used by the CLI.

pub mod config;
pub mod conversation;
pub mod error;
pub mod feed;
pub mod gateway;
pub mod graph;
pub mod init;
pub mod session;
pub mod surface;
pub mod upload;

#[cfg(test)]
mod testing;
