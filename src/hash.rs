//! Rolling polynomial hash and probe-stride strategies.
//!
//! Hashes here are always reduced modulo the table size they are computed
//! for, so a cached hash is the home index of its entry and must be
//! recomputed whenever the table changes size.

/// Polynomial rolling hash `h = (a*h + c) mod M`, with the multiplier `a`
/// advanced by `b mod (M - 1)` after every character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolyHash {
    a: u64,
    b: u64,
}

impl PolyHash {
    /// Home-index hash used by both engines.
    pub const PRIMARY: PolyHash = PolyHash::new(31415, 27183);
    /// Seeds swapped so the stride is decorrelated from the home index.
    pub const SECONDARY: PolyHash = PolyHash::new(27183, 31415);

    pub const fn new(a: u64, b: u64) -> Self {
        Self { a, b }
    }

    /// Hash a character sequence into `[0, modulus)`.
    ///
    /// The running multiplier is kept reduced modulo `modulus`; the result is
    /// the same as carrying the unreduced multiplier because only `a*h mod M`
    /// is ever observed.
    pub fn hash_chars<I>(&self, chars: I, modulus: usize) -> usize
    where
        I: IntoIterator<Item = char>,
    {
        if modulus < 2 {
            return 0;
        }
        let m = modulus as u64;
        let step = self.b % (m - 1);
        let mut a = self.a % m;
        let mut h = 0u64;
        for c in chars {
            h = ((a as u128 * h as u128 + c as u128) % m as u128) as u64;
            a = (a + step) % m;
        }
        h as usize
    }
}

/// Keys the tables know how to hash.
///
/// Text hashes through [`PolyHash`]; integers hash to themselves modulo the
/// table size. Lookups by a borrowed form (`&str` for `String` keys) must
/// hash identically to the owned key.
pub trait KeyHash {
    fn key_hash(&self, hasher: &PolyHash, modulus: usize) -> usize;
}

impl KeyHash for str {
    fn key_hash(&self, hasher: &PolyHash, modulus: usize) -> usize {
        hasher.hash_chars(self.chars(), modulus)
    }
}

impl KeyHash for String {
    fn key_hash(&self, hasher: &PolyHash, modulus: usize) -> usize {
        self.as_str().key_hash(hasher, modulus)
    }
}

impl KeyHash for char {
    fn key_hash(&self, hasher: &PolyHash, modulus: usize) -> usize {
        hasher.hash_chars([*self], modulus)
    }
}

impl<T: KeyHash + ?Sized> KeyHash for &T {
    fn key_hash(&self, hasher: &PolyHash, modulus: usize) -> usize {
        (**self).key_hash(hasher, modulus)
    }
}

macro_rules! unsigned_key_hash {
    ($($t:ty),*) => {$(
        impl KeyHash for $t {
            fn key_hash(&self, _hasher: &PolyHash, modulus: usize) -> usize {
                if modulus == 0 {
                    return 0;
                }
                (*self as u128 % modulus as u128) as usize
            }
        }
    )*};
}

macro_rules! signed_key_hash {
    ($($t:ty),*) => {$(
        impl KeyHash for $t {
            fn key_hash(&self, _hasher: &PolyHash, modulus: usize) -> usize {
                if modulus == 0 {
                    return 0;
                }
                (*self as i128).rem_euclid(modulus as i128) as usize
            }
        }
    )*};
}

unsigned_key_hash!(u8, u16, u32, u64, usize);
signed_key_hash!(i8, i16, i32, i64, isize);

/// How the open-addressing engine derives its probe stride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbeStrategy {
    /// Constant secondary hash: every key probes slot by slot. Keys sharing a
    /// home index cluster into one contiguous run.
    #[default]
    Linear,
    /// Secondary [`PolyHash`] stride, bumped until coprime with the table size
    /// so each probe sequence still visits every slot.
    DoubleHash,
}

impl ProbeStrategy {
    /// Stride in `[1, size - 1]` for `key` in a table of `size` slots.
    pub fn stride<Q>(&self, key: &Q, size: usize) -> usize
    where
        Q: ?Sized + KeyHash,
    {
        if size <= 2 {
            return 1;
        }
        let raw = match self {
            ProbeStrategy::Linear => 0,
            ProbeStrategy::DoubleHash => key.key_hash(&PolyHash::SECONDARY, size - 1),
        };
        let mut step = raw % (size - 1) + 1;
        // size - 1 is always coprime with size, so this stops.
        while gcd(step, size) != 1 {
            step += 1;
        }
        step
    }
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reference computation with an unreduced multiplier.
    fn naive(s: &str, m: u64) -> u64 {
        let (mut h, mut a, b) = (0u128, 31415u128, 27183u128);
        for c in s.chars() {
            h = (a * h + c as u128) % m as u128;
            a += b % (m as u128 - 1);
        }
        h as u64
    }

    #[test]
    fn reduced_multiplier_matches_unreduced() {
        for m in [2usize, 7, 11, 111, 1009, 65_537] {
            for s in ["", "a", "hello", "the quick brown fox", "ünïcödé"] {
                assert_eq!(
                    PolyHash::PRIMARY.hash_chars(s.chars(), m) as u64,
                    naive(s, m as u64),
                    "{s:?} mod {m}"
                );
            }
        }
    }

    #[test]
    fn owned_and_borrowed_text_agree() {
        let owned = String::from("borrowed");
        assert_eq!(
            owned.key_hash(&PolyHash::PRIMARY, 97),
            "borrowed".key_hash(&PolyHash::PRIMARY, 97)
        );
    }

    #[test]
    fn integers_hash_to_themselves() {
        assert_eq!(42u32.key_hash(&PolyHash::PRIMARY, 11), 42 % 11);
        assert_eq!((-3i64).key_hash(&PolyHash::PRIMARY, 11), 8);
        assert_eq!(7usize.key_hash(&PolyHash::SECONDARY, 100), 7);
    }

    #[test]
    fn empty_key_hashes_to_zero() {
        assert_eq!("".key_hash(&PolyHash::PRIMARY, 11), 0);
    }

    #[test]
    fn linear_stride_is_one() {
        for size in [2usize, 3, 11, 111] {
            assert_eq!(ProbeStrategy::Linear.stride("anything", size), 1);
        }
    }

    #[test]
    fn double_hash_stride_is_coprime_and_in_range() {
        for size in [3usize, 4, 12, 111, 1000] {
            for key in ["a", "b", "collide", "zzz", "stride"] {
                let s = ProbeStrategy::DoubleHash.stride(key, size);
                assert!(s >= 1 && s < size, "stride {s} for size {size}");
                assert_eq!(gcd(s, size), 1);
            }
        }
    }
}
