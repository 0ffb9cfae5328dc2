//! Immutable minimal perfect hash maps using the Compress-Hash-Displace scheme.
//!
//! The `chdmap` crate is the read side of a CHD map: given the output of an
//! external builder (a seed, a compressed displacement index and the
//! slot-aligned key/value tables) it resolves any key to its slot in constant
//! time, and persists or reloads the whole structure in a compact positional
//! binary format.
//!
//! Lookups never fail and never check membership. A key outside the build set
//! resolves to some in-range slot; callers compare the stored key when they
//! need to know.
//!
//! ```
//! use chdmap::{ChdMap, ChdParts};
//!
//! # fn main() -> chdmap::Result<()> {
//! // a single-slot map resolves every key to slot 0
//! let parts = ChdParts {
//!     seed: [0, 0],
//!     table_size: 1,
//!     index: vec![0],
//!     keys: vec![b"apple".to_vec()],
//!     values: vec![b"1".to_vec()],
//! };
//! let bytes = ChdMap::from_parts(parts)?.to_bytes()?;
//!
//! let map = ChdMap::decode(&bytes)?;
//! assert_eq!(map.get("apple"), b"1");
//! assert_eq!(map.key_at(map.resolve_slot("apple")), Some(&b"apple"[..]));
//! # Ok(())
//! # }
//! ```

mod codec;
pub use codec::{CountingEncoder, SliceDecoder};

mod error;
pub use error::{ChdError, Result};

mod hasher;
pub use hasher::{ChdHasher, ChdHashes, Xxh3Hasher};

mod meta;
pub use meta::{ChdHeader, ChdMapInfo};

mod reader;
pub use reader::ChdReader;

mod writer;
pub use writer::{ChdWriter, ChdWriterWrapper};

mod chd;
pub use chd::{ChdMap, ChdMapIter, ChdParts};

#[cfg(test)]
mod testing;
