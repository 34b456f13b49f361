pub mod cache;
pub mod commands;
pub mod deploy;
pub mod launcher;
pub mod pack;
pub mod registry;
pub mod resolve;
pub mod retry;
pub mod runtime;
