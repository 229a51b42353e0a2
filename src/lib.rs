// src/lib.rs

//! feedwatch library
//!
//! Incremental change detection over feeds, pages, release APIs and paper
//! searches, with bounded, ordered notification dispatch.

pub mod error;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
