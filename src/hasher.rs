use serde::Serialize;
use xxhash_rust::xxh3::xxh3_64_with_seed;

/// Output of one hash primitive call.
///
/// `h1` selects the displacement bucket, `h2` and `h3` feed the slot formula.
/// `reserved` is produced by the primitive but not consumed by resolution.
#[derive(Serialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChdHashes {
    pub h1: u64,
    pub h2: u64,
    pub h3: u64,
    pub reserved: u64,
}

/// Seeded hash primitive used to resolve keys.
///
/// Implementations must be deterministic and must never change their output
/// for a given `(key, seed0, seed1)`: only the seed is persisted with a map,
/// so any algorithm change silently invalidates every serialized map. Output
/// must not depend on the host's byte order or pointer width.
pub trait ChdHasher {
    /// Stable identifier reported by [`ChdMapInfo`](crate::ChdMapInfo).
    const NAME: &'static str;

    fn hash(&self, key: &[u8], seed0: u64, seed1: u64) -> ChdHashes;
}

/// Default hash primitive: four XXH3-64 lanes over the raw key bytes.
///
/// Lane `i` is seeded with `(seed0 + LANE_MIX[i]) ^ rotl(seed1, 16 * i + 8)`.
/// XXH3 has a published, endian-independent definition, so maps resolve the
/// same on every target.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Xxh3Hasher;

impl Xxh3Hasher {
    const LANE_MIX: [u64; 4] = [
        0x9E37_79B9_7F4A_7C15,
        0xC2B2_AE3D_27D4_EB4F,
        0x1656_67B1_9E37_79F9,
        0xD6E8_FEB8_6659_FD93,
    ];

    fn lane(key: &[u8], seed0: u64, seed1: u64, lane: usize) -> u64 {
        let seed = seed0.wrapping_add(Self::LANE_MIX[lane]) ^ seed1.rotate_left(16 * lane as u32 + 8);
        xxh3_64_with_seed(key, seed)
    }
}

impl ChdHasher for Xxh3Hasher {
    const NAME: &'static str = "xxh3-x4";

    fn hash(&self, key: &[u8], seed0: u64, seed1: u64) -> ChdHashes {
        ChdHashes {
            h1: Self::lane(key, seed0, seed1, 0),
            h2: Self::lane(key, seed0, seed1, 1),
            h3: Self::lane(key, seed0, seed1, 2),
            reserved: Self::lane(key, seed0, seed1, 3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xxh3_reference_values() {
        // published XXH3-64 sanity values for the empty input
        assert_eq!(xxh3_64_with_seed(b"", 0), 0x2D06_8005_38D3_94C2);
        assert_eq!(
            xxh3_64_with_seed(b"", 0x9E37_79B1_85EB_CA8D),
            0xA8A6_B918_B2F0_364A
        );
    }

    #[test]
    fn test_known_hashes() {
        let cases: [(&[u8], u64, u64, [u64; 4]); 4] = [
            (
                b"",
                0,
                0,
                [
                    0x602b_0e2c_d666_2c8b,
                    0x1e74_4138_e345_56f4,
                    0x852b_fe93_c366_12f5,
                    0x800c_75e2_1691_8121,
                ],
            ),
            (
                b"apple",
                0,
                0,
                [
                    0x23d1_453c_94aa_695d,
                    0x3c40_c024_edca_95f9,
                    0x8d57_f3eb_3871_57a0,
                    0x81e0_5aeb_7fa7_2d10,
                ],
            ),
            (
                b"apple",
                1,
                2,
                [
                    0xc0f7_c4c9_23fc_a7e9,
                    0xce82_18da_eab6_f3d7,
                    0x12b9_d51c_beee_1bf0,
                    0x486d_96b3_3ffe_71ca,
                ],
            ),
            (
                b"0123456789abcdef-17",
                42,
                7,
                [
                    0x605b_0301_bc98_5f63,
                    0x3f97_46b0_d0b2_f81c,
                    0x4a95_85fb_09a2_72d6,
                    0x03ad_88f5_c8a3_1b3e,
                ],
            ),
        ];
        for (key, seed0, seed1, [h1, h2, h3, reserved]) in cases {
            assert_eq!(
                Xxh3Hasher.hash(key, seed0, seed1),
                ChdHashes {
                    h1,
                    h2,
                    h3,
                    reserved
                },
                "key {key:?} seed ({seed0}, {seed1})"
            );
        }
    }

    #[test]
    fn test_hasher_deterministic() {
        let hasher = Xxh3Hasher;
        let a = hasher.hash(b"apple", 1, 2);
        assert_eq!(a, hasher.hash(b"apple", 1, 2));
        assert_ne!(a, hasher.hash(b"apple", 2, 1));
        assert_ne!(a, hasher.hash(b"apples", 1, 2));
    }

    #[test]
    fn test_hasher_lanes_differ() {
        let hashes = Xxh3Hasher.hash(b"banana", 0, 0);
        let lanes = [hashes.h1, hashes.h2, hashes.h3, hashes.reserved];
        for i in 0..lanes.len() {
            for j in i + 1..lanes.len() {
                assert_ne!(lanes[i], lanes[j], "lanes {i} and {j} collide");
            }
        }
    }

    #[test]
    fn test_hasher_spread() {
        const BUCKETS: u64 = 16;
        let mut counts = [0u32; BUCKETS as usize];
        for i in 0..4096u32 {
            let h = Xxh3Hasher.hash(&i.to_le_bytes(), 42, 7);
            counts[(h.h2 % BUCKETS) as usize] += 1;
        }
        // 256 expected per bucket
        assert!(counts.iter().all(|&c| c > 128 && c < 384), "{counts:?}");
    }
}
