#![no_main]
use arbitrary::{Arbitrary, Result, Unstructured};
use cuckoo_table::{coding::Encode, Builder, Config, InternalKey, Reader, ValueType};
use libfuzzer_sys::fuzz_target;
use std::collections::BTreeMap;

#[derive(Arbitrary, Debug)]
struct Params {
    user_key_len: u8,
    value_len: u8,
    ratio: u8,
    block_size: u8,
    last_level: bool,
    seed: u64,
}

fuzz_target!(|data: &[u8]| {
    let mut unstructured = Unstructured::new(data);

    let Ok(params) = Params::arbitrary(&mut unstructured) else {
        return;
    };

    let user_key_len = usize::from(params.user_key_len % 16) + 2;
    let value_len = usize::from(params.value_len % 16);
    let ratio = f64::from(params.ratio.max(1)) / 255.0;
    let block_size = u32::from(params.block_size % 8) + 1;

    let mut items = BTreeMap::new();

    while let Ok(seqno) = u16::arbitrary(&mut unstructured) {
        let key: Result<Vec<u8>> = (0..user_key_len)
            .map(|_| u8::arbitrary(&mut unstructured))
            .collect();

        let Ok(key) = key else {
            break;
        };

        let seqno = if params.last_level { 0 } else { u64::from(seqno) };
        items.insert(key, seqno);
    }

    let hasher = cuckoo_table::Xxh3HashStrategy::with_seed(params.seed);
    let config = Config::new(user_key_len + 8, value_len)
        .hash_table_ratio(ratio)
        .cuckoo_block_size(block_size)
        .last_level(params.last_level);

    let mut builder = Builder::new(Vec::new(), config, hasher);

    for (key, seqno) in &items {
        let key = InternalKey::new(key.as_slice(), *seqno, ValueType::Value);
        let value = vec![*seqno as u8; value_len];
        builder.add(&key.encode_into_vec(), &value).unwrap();
    }

    if builder.finish().is_err() {
        // Placement may legitimately fail for adversarial hashes
        return;
    }

    let bytes = builder.into_inner();
    let reader = Reader::open(&bytes, bytes.len() as u64, hasher).unwrap();

    for (key, seqno) in &items {
        let query = if params.last_level {
            key.clone()
        } else {
            InternalKey::new(key.as_slice(), 0, ValueType::Value).encode_into_vec()
        };

        let item = reader.get(&query).unwrap().expect("should exist");
        assert_eq!(*seqno, item.key.seqno);
        assert_eq!(&vec![*seqno as u8; value_len], &*item.value);
    }
});
