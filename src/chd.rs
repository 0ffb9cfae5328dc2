use std::io::{BufWriter, Write};

use tracing::debug;

use crate::codec::{CountingEncoder, SliceDecoder, WORD};
use crate::{
    ChdError, ChdHasher, ChdHeader, ChdMapInfo, ChdReader, ChdWriter, ChdWriterWrapper, Result,
    Xxh3Hasher,
};

const DEFAULT_WRITER_BUFFER_SIZE: usize = 16 << 20; // 16 MiB

/// Output of an external CHD builder.
///
/// `keys[i]` and `values[i]` belong to slot `i`. Each `index` code packs a
/// displacement pair as `d0 * table_size + d1`. The builder is responsible
/// for choosing `seed` and `index` so that resolution is collision-free over
/// `keys`; [`ChdMap::from_parts`] only checks the structural invariants.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChdParts {
    pub seed: [u64; 2],
    pub table_size: u64,
    pub index: Vec<u64>,
    pub keys: Vec<Vec<u8>>,
    pub values: Vec<Vec<u8>>,
}

/// Immutable minimal perfect hash map using the Compress-Hash-Displace scheme.
///
/// A `ChdMap` is populated once, either by decoding a serialized blob
/// ([`decode`](Self::decode), [`load`](Self::load)) or from builder output
/// ([`from_parts`](Self::from_parts)), and never changes afterwards. Lookups
/// cost one hash primitive call plus constant arithmetic.
///
/// Resolution does not check membership: a key outside the build set still
/// resolves to some in-range slot. Callers that need to know whether a key
/// was present compare it against [`key_at`](Self::key_at).
///
/// # Type Parameters
/// - `H`: hash primitive; must be the one the map was built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChdMap<H: ChdHasher = Xxh3Hasher> {
    header: ChdHeader,
    index: Vec<u64>,
    keys: Vec<Vec<u8>>,
    values: Vec<Vec<u8>>,
    hasher: H,
}

impl ChdMap {
    /// Creates an empty map using the default hash primitive.
    pub fn new() -> Self {
        Self::with_hasher(Xxh3Hasher)
    }

    /// Validates builder output and wraps it in a map.
    ///
    /// # Errors
    ///
    /// Returns [`ChdError::Inconsistent`] when the key or value table length
    /// differs from `table_size`, or when keys exist but the index is empty.
    pub fn from_parts(parts: ChdParts) -> Result<Self> {
        Self::from_parts_with_hasher(parts, Xxh3Hasher)
    }

    /// Decodes a map from `bytes`, ignoring anything after the last slot.
    ///
    /// # Errors
    ///
    /// Returns [`ChdError::UnexpectedEof`] when `bytes` is shorter than the
    /// header and slot lengths declare, [`ChdError::LengthOverflow`] when a
    /// declared size cannot be represented, and [`ChdError::Inconsistent`]
    /// when the header violates the map invariants.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Self::decode_prefix(bytes).map(|(map, _)| map)
    }

    /// Like [`decode`](Self::decode), also returning the number of bytes consumed.
    pub fn decode_prefix(bytes: &[u8]) -> Result<(Self, usize)> {
        Self::decode_prefix_with_hasher(bytes, Xxh3Hasher)
    }

    /// Loads a map serialized at the start of `reader`.
    pub fn load<R: ChdReader>(reader: R) -> Result<Self> {
        Self::load_at(reader, 0)
    }

    /// Loads a map serialized at `offset` within `reader`.
    pub fn load_at<R: ChdReader>(reader: R, offset: u64) -> Result<Self> {
        Self::load_at_with_hasher(reader, offset, Xxh3Hasher)
    }
}

impl Default for ChdMap {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ChdHasher> ChdMap<H> {
    /// Creates an empty map resolved with `hasher`.
    pub fn with_hasher(hasher: H) -> Self {
        ChdMap {
            header: ChdHeader::default(),
            index: Vec::new(),
            keys: Vec::new(),
            values: Vec::new(),
            hasher,
        }
    }

    /// See [`ChdMap::from_parts`].
    pub fn from_parts_with_hasher(parts: ChdParts, hasher: H) -> Result<Self> {
        let ChdParts {
            seed,
            table_size,
            index,
            keys,
            values,
        } = parts;
        if keys.len() as u64 != table_size || values.len() as u64 != table_size {
            return Err(ChdError::Inconsistent(format!(
                "table size {} but {} keys and {} values",
                table_size,
                keys.len(),
                values.len()
            )));
        }
        let header = ChdHeader {
            seed,
            table_size,
            index_len: index.len() as u64,
            length: table_size,
        };
        header.validate()?;
        Ok(ChdMap {
            header,
            index,
            keys,
            values,
            hasher,
        })
    }

    /// See [`ChdMap::decode_prefix`].
    pub fn decode_prefix_with_hasher(bytes: &[u8], hasher: H) -> Result<(Self, usize)> {
        let mut decoder = SliceDecoder::new(bytes);
        let header = ChdHeader::decode(&mut decoder)?;
        header.validate()?;
        let map = Self::decode_body(&mut decoder, header, hasher)?;
        debug!(
            table_size = header.table_size,
            index_len = header.index_len,
            bytes = decoder.position(),
            "chd map decoded"
        );
        Ok((map, decoder.position()))
    }

    /// See [`ChdMap::load_at`].
    ///
    /// The header is read and validated first; the index and slot region is
    /// then read in a single request spanning to the end of `reader`.
    pub fn load_at_with_hasher<R: ChdReader>(reader: R, offset: u64, hasher: H) -> Result<Self> {
        let available = reader.len()?.saturating_sub(offset);
        if available < ChdHeader::SIZE as u64 {
            return Err(ChdError::UnexpectedEof {
                offset,
                needed: ChdHeader::SIZE as u64,
                available,
            });
        }

        let header = reader.read_exact_at(offset, ChdHeader::SIZE as u64, |data| {
            Ok(ChdHeader::decode(&mut SliceDecoder::with_base(data, offset)))
        })??;
        header.validate()?;

        let body_offset = offset + ChdHeader::SIZE as u64;
        let body_length = available - ChdHeader::SIZE as u64;
        let map = reader.read_exact_at(body_offset, body_length, |data| {
            let mut decoder = SliceDecoder::with_base(data, body_offset);
            Ok(Self::decode_body(&mut decoder, header, hasher))
        })??;

        debug!(
            offset,
            table_size = header.table_size,
            index_len = header.index_len,
            "chd map loaded"
        );
        Ok(map)
    }

    fn decode_body(decoder: &mut SliceDecoder<'_>, header: ChdHeader, hasher: H) -> Result<Self> {
        let index_len = decoder.ensure("index_len", header.index_len, WORD as u64)?;
        let mut index = Vec::with_capacity(index_len);
        for _ in 0..index_len {
            index.push(decoder.read_u64()?);
        }

        // every slot carries at least its two length words
        let table_size = decoder.ensure("table_size", header.table_size, 2 * WORD as u64)?;
        let mut keys = Vec::with_capacity(table_size);
        let mut values = Vec::with_capacity(table_size);
        for _ in 0..table_size {
            let key_len = decoder.read_u64()?;
            let value_len = decoder.read_u64()?;
            keys.push(decoder.read_bytes(key_len)?.to_vec());
            values.push(decoder.read_bytes(value_len)?.to_vec());
        }

        Ok(ChdMap {
            header,
            index,
            keys,
            values,
            hasher,
        })
    }

    /// Resolves `key` to a slot in `[0, table_size)`.
    ///
    /// Always succeeds, even for keys that were never part of the build set;
    /// such keys alias the slot of some other key. An empty map resolves
    /// everything to slot `0`.
    pub fn resolve_slot<K: AsRef<[u8]> + ?Sized>(&self, key: &K) -> u64 {
        let header = &self.header;
        if header.length == 0 {
            return 0;
        }

        let hashes = self
            .hasher
            .hash(key.as_ref(), header.seed[0], header.seed[1]);
        let code = self.index[(hashes.h1 % header.index_len) as usize];

        let table_size = header.table_size;
        let d0 = code / table_size;
        let d1 = code % table_size;
        let h2 = hashes.h2 % table_size;
        let h3 = hashes.h3 % table_size;
        h2.wrapping_add(d0.wrapping_mul(h3)).wrapping_add(d1) % table_size
    }

    /// Returns the value stored in the slot `key` resolves to.
    ///
    /// There is no membership check: for a key outside the build set this is
    /// the value of whichever key shares its slot.
    ///
    /// # Panics
    ///
    /// Panics when the map is empty.
    pub fn get<K: AsRef<[u8]> + ?Sized>(&self, key: &K) -> &[u8] {
        &self.values[self.resolve_slot(key) as usize]
    }

    /// Returns the number of keys in this map.
    pub fn len(&self) -> u64 {
        self.header.length
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Memory footprint in bytes. Not implemented; always `0`.
    pub fn size_in_bytes(&self) -> usize {
        0
    }

    pub fn header(&self) -> &ChdHeader {
        &self.header
    }

    pub fn seed(&self) -> [u64; 2] {
        self.header.seed
    }

    pub fn table_size(&self) -> u64 {
        self.header.table_size
    }

    pub fn index_len(&self) -> u64 {
        self.header.index_len
    }

    /// Displacement codes, one per primary bucket.
    pub fn index(&self) -> &[u64] {
        &self.index
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    pub fn keys(&self) -> &[Vec<u8>] {
        &self.keys
    }

    pub fn values(&self) -> &[Vec<u8>] {
        &self.values
    }

    pub fn key_at(&self, slot: u64) -> Option<&[u8]> {
        self.keys.get(usize::try_from(slot).ok()?).map(Vec::as_slice)
    }

    pub fn value_at(&self, slot: u64) -> Option<&[u8]> {
        self.values.get(usize::try_from(slot).ok()?).map(Vec::as_slice)
    }

    /// Returns the key/value pair stored in `slot`, if it is in range.
    pub fn entry(&self, slot: u64) -> Option<(&[u8], &[u8])> {
        Some((self.key_at(slot)?, self.value_at(slot)?))
    }

    /// Iterates over all entries in slot order.
    pub fn iter(&self) -> ChdMapIter<'_> {
        ChdMapIter {
            keys: self.keys.iter(),
            values: self.values.iter(),
        }
    }

    /// Exact number of bytes [`write_to`](Self::write_to) emits.
    pub fn encoded_len(&self) -> u64 {
        let slots: u64 = self
            .keys
            .iter()
            .zip(&self.values)
            .map(|(k, v)| 2 * WORD as u64 + k.len() as u64 + v.len() as u64)
            .sum();
        ChdHeader::SIZE as u64 + WORD as u64 * self.index.len() as u64 + slots
    }

    pub fn info(&self) -> ChdMapInfo {
        ChdMapInfo {
            header: self.header,
            hasher: H::NAME,
            encoded_len: self.encoded_len(),
            key_bytes: self.keys.iter().map(|k| k.len() as u64).sum(),
            value_bytes: self.values.iter().map(|v| v.len() as u64).sum(),
        }
    }

    /// Serializes the map to `writer` and returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Stops at the first IO failure and returns [`ChdError::Write`] carrying
    /// the number of bytes of fully written fields; a partially written field
    /// is not counted. Whatever `writer` received is not a valid map and must
    /// be discarded.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<u64> {
        let mut encoder = CountingEncoder::new(writer);
        self.header.encode(&mut encoder)?;
        for &code in &self.index {
            encoder.write_u64(code)?;
        }
        for (key, value) in self.keys.iter().zip(&self.values) {
            encoder.write_u64(key.len() as u64)?;
            encoder.write_u64(value.len() as u64)?;
            encoder.write_bytes(key)?;
            encoder.write_bytes(value)?;
        }
        encoder.flush()?;

        debug!(
            table_size = self.header.table_size,
            index_len = self.header.index_len,
            bytes = encoder.written(),
            "chd map encoded"
        );
        Ok(encoder.written())
    }

    /// Serializes the map into a new buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.encoded_len() as usize);
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }

    /// Writes the map to a positional writer starting at `offset`.
    pub fn save<W: ChdWriter + ?Sized>(&self, writer: &W, offset: u64) -> Result<u64> {
        self.save_with_buffer_size(writer, offset, DEFAULT_WRITER_BUFFER_SIZE)
    }

    /// Like [`save`](Self::save) with an explicit write buffer capacity.
    pub fn save_with_buffer_size<W: ChdWriter + ?Sized>(
        &self,
        writer: &W,
        offset: u64,
        buffer_size: usize,
    ) -> Result<u64> {
        let buf_writer = BufWriter::with_capacity(buffer_size, ChdWriterWrapper::new(writer, offset));
        self.write_to(buf_writer)
    }
}

/// Iterator over the entries of a [`ChdMap`] in slot order.
#[derive(Debug, Clone)]
pub struct ChdMapIter<'a> {
    keys: std::slice::Iter<'a, Vec<u8>>,
    values: std::slice::Iter<'a, Vec<u8>>,
}

impl<'a> Iterator for ChdMapIter<'a> {
    type Item = (&'a [u8], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        Some((self.keys.next()?.as_slice(), self.values.next()?.as_slice()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.keys.size_hint()
    }
}

impl ExactSizeIterator for ChdMapIter<'_> {}

impl<'a, H: ChdHasher> IntoIterator for &'a ChdMap<H> {
    type Item = (&'a [u8], &'a [u8]);
    type IntoIter = ChdMapIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
