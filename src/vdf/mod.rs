//! Key-value tree codec for client configuration files.
//!
//! The configuration files are recursive key-value trees in one of two
//! physical encodings:
//!
//! - **Text**: nested `"key" "value"` pairs and braced blocks
//!   (`localconfig.vdf`, `screenshots.vdf`).
//! - **Binary**: a stream of type-tagged, null-terminated records
//!   (`shortcuts.vdf`).
//!
//! Both decode into the same [`Node`] tree, and both writers preserve child
//! insertion order so an unmodified subtree is written back the way it was
//! read.
//!
//! ```text
//! "UserLocalConfigStore"            0x00 "shortcuts" 0x00
//! {                                   0x00 "0" 0x00
//!     "Software"                        0x01 "appname" 0x00 "Game" 0x00
//!     {                                 0x08
//!         ...                         0x08
//!     }                             0x08
//! }
//! ```

pub mod binary;
pub mod error;
pub mod node;
pub mod text;

pub use error::{Position, VdfError};
pub use node::{Node, Value};
pub use text::ParseOptions;
