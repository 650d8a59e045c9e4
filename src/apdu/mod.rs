//! APDU command/response protocol
//!
//! Types, wire codec and the raise policy deciding which status words are
//! reported as protocol failures, plus payload builders for derivation
//! paths and long messages.

pub mod bip32;
pub mod codec;
pub mod payload;
pub mod policy;
pub mod status;
pub mod types;

pub use bip32::{pack_derivation_path, DerivationPath};
pub use payload::{prefix_with_len, split_message};
pub use policy::{RaisePolicy, Verdict};
pub use status::status_name;
pub use types::{Command, Response, MAX_DATA_LEN};
