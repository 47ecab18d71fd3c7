//! sciharvest - scientific article harvesting and controversy scoring.
//!
//! Lists new articles from OpenAlex and an OAI-PMH endpoint, downloads and
//! extracts their PDFs, cleans the text and scores it for sentiment
//! divergence. GROBID provides structured metadata on request.

pub mod cleaner;
pub mod cli;
pub mod config;
pub mod extract;
pub mod fetch;
pub mod grobid;
pub mod http_client;
pub mod models;
pub mod nlp;
pub mod repository;
pub mod schema;
pub mod server;
pub mod services;
pub mod sources;
pub mod tei;
