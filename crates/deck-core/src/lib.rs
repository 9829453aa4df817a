pub mod action;
pub mod config;
pub mod control;
pub mod device;
pub mod scanner;
