#![forbid(unsafe_code)]

pub mod artifacts;
pub mod classify;
pub mod cli;
pub mod crawl;
pub mod dispatch;
pub mod frontier;
pub mod logging;
pub mod render;
pub mod seeds;
pub mod session;
