use serde::Serialize;

use crate::codec::{CountingEncoder, SliceDecoder, WORD};
use crate::{ChdError, Result};

/// Fixed-size header leading every serialized CHD map.
#[derive(Serialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChdHeader {
    /// Parameters of the hash primitive.
    pub seed: [u64; 2],
    /// Number of key/value slots.
    pub table_size: u64,
    /// Number of displacement codes in the index.
    pub index_len: u64,
    /// Number of keys; zero marks an empty map.
    pub length: u64,
}

impl ChdHeader {
    pub const SIZE: usize = WORD * 5;

    pub(crate) fn decode(decoder: &mut SliceDecoder<'_>) -> Result<Self> {
        let seed0 = decoder.read_u64()?;
        let seed1 = decoder.read_u64()?;
        let table_size = decoder.read_u64()?;
        let index_len = decoder.read_u64()?;
        let length = decoder.read_u64()?;
        Ok(ChdHeader {
            seed: [seed0, seed1],
            table_size,
            index_len,
            length,
        })
    }

    pub(crate) fn encode<W: std::io::Write>(&self, encoder: &mut CountingEncoder<W>) -> Result<()> {
        encoder.write_u64(self.seed[0])?;
        encoder.write_u64(self.seed[1])?;
        encoder.write_u64(self.table_size)?;
        encoder.write_u64(self.index_len)?;
        encoder.write_u64(self.length)
    }

    /// Checks the header-level invariants that resolution relies on.
    pub fn validate(&self) -> Result<()> {
        if self.length != self.table_size {
            return Err(ChdError::Inconsistent(format!(
                "length {} does not match table size {}",
                self.length, self.table_size
            )));
        }
        if self.length > 0 && self.index_len == 0 {
            return Err(ChdError::Inconsistent(format!(
                "{} keys but an empty displacement index",
                self.length
            )));
        }
        Ok(())
    }
}

/// Summary of a loaded map, suitable for printing or logging.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ChdMapInfo {
    /// The decoded header.
    pub header: ChdHeader,
    /// Name of the hash primitive the map is resolved with.
    pub hasher: &'static str,
    /// Exact length of the serialized form in bytes.
    pub encoded_len: u64,
    /// Sum of all key lengths in bytes.
    pub key_bytes: u64,
    /// Sum of all value lengths in bytes.
    pub value_bytes: u64,
}
