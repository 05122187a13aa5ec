pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod net;
pub mod page;
pub mod protocol;
pub mod search;
pub mod session;
