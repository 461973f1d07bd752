// src/ingest/providers/mod.rs
pub mod trends_rss;
