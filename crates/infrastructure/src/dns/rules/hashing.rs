use ahash::RandomState;
use std::borrow::Cow;

// fixed keys keep hashes identical from one run to the next
const SEEDS: [u64; 4] = [
    0x5765_6972_2d64_6e73,
    0x9e37_79b9_7f4a_7c15,
    0xc2b2_ae3d_27d4_eb4f,
    0x1656_67b1_9e37_79f9,
];

#[inline]
fn lowercase(text: &str) -> Cow<'_, str> {
    if text.bytes().any(|b| b.is_ascii_uppercase()) {
        Cow::Owned(text.to_ascii_lowercase())
    } else {
        Cow::Borrowed(text)
    }
}

pub(crate) fn hash64(text: &str) -> u64 {
    let state = RandomState::with_seeds(SEEDS[0], SEEDS[1], SEEDS[2], SEEDS[3]);
    state.hash_one(lowercase(text).as_ref())
}

pub(crate) fn hash32(text: &str) -> u32 {
    let hash = hash64(text);
    (hash ^ (hash >> 32)) as u32
}
