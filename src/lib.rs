pub mod actions;
pub mod config;
pub mod exception;
pub mod fetcher;
pub mod output;
pub mod porttree;
pub mod xml;
