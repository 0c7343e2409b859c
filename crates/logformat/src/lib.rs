//! # logformat - YARN aggregated log blocks
//!
//! The value of a container record in an aggregated log archive is a plain
//! concatenation of log files, each framed by two length-prefixed strings:
//!
//! ```text
//! [name: utf]["<decimal length>": utf][payload ...]
//! ```
//!
//! [`FrameDecoder`] walks that stream block by block. Each payload is exposed
//! through a [`BoundedReader`] that cannot read into the next block and that
//! skips whatever its consumer leaves behind.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::io::{self, Read};
//! use logformat::FrameDecoder;
//!
//! # fn value_stream() -> &'static [u8] { &[] }
//! let mut decoder = FrameDecoder::new(value_stream());
//! let blocks = decoder
//!     .decode_frames(&mut |name: &str, _len: u64, payload: &mut dyn Read| {
//!         println!("{}", name);
//!         io::copy(payload, &mut io::sink())
//!     })
//!     .unwrap();
//! println!("{} blocks", blocks);
//! ```

mod bounded;
mod frame;
pub mod utf;

pub use bounded::BoundedReader;
pub use frame::{BlockSink, FrameDecoder, FrameError, LogBlock};
pub use utf::{read_utf, try_read_utf};

#[cfg(any(test, feature = "testing"))]
pub use frame::{encode_log_blocks, write_log_block};
#[cfg(any(test, feature = "testing"))]
pub use utf::write_utf;
