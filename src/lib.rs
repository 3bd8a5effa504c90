// src/lib.rs

//! Performer event feed service for eventernote listings.

pub mod error;
pub mod feeds;
pub mod models;
pub mod pipeline;
pub mod server;
pub mod services;
pub mod storage;
pub mod utils;
