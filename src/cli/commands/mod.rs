//! Command implementations, one module per command group.

pub mod grobid;
pub mod harvest;
pub mod init;
pub mod pipeline;
pub mod purge;
pub mod search;
pub mod serve;
pub mod status;
