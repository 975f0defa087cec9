//! Lexicon archive codec layers
//!
//! Leaf-first:
//!
//! - [`checksum`] - CRC-32 over the uncompressed envelope bytes
//! - [`compression`] - gzip stream for image payloads
//! - [`frame`] - marker-delimited frame packed into RGB pixel triplets
//! - [`container`] - PNG canvas with a 3-pixel locating header
//! - [`records`] / [`envelope`] - typed collections and the versioned document
//! - [`store`] / [`settings`] - destination collaborators
//! - [`restore`] - ordered, all-or-nothing bulk replace
//! - [`pipeline`] - the document and image codecs end to end
//!
//! ## Image artifact
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ px0 "LXC" │ px1 w_hi w_lo h_hi │ px2 h_lo 0 0 │  ← metadata header
//! │   ┌──────────────────────────────────────┐   │
//! │   │ pixel block at (16, 16)              │   │
//! │   │  "LXFRAME>" v1 len payload crc       │   │
//! │   │  "<LXFRAME" 0-padding                │   │
//! │   └──────────────────────────────────────┘   │
//! │              decoration only                 │
//! └──────────────────────────────────────────────┘
//! ```

pub mod checksum;
pub mod compression;
pub mod config;
pub mod container;
pub mod envelope;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod progress;
pub mod records;
pub mod restore;
pub mod settings;
pub mod store;
