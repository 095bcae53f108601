pub mod cli;
pub mod config;
pub mod container;
pub mod credentials;
pub mod oauth_flow;
pub mod remote;
pub mod storage;
pub mod token_provider;
pub mod upload;
