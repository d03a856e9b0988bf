use super::*;
use crate::{
    coding::Encode, file::ReadAt, Checksum, Config, HashStrategy, InternalKey, InternalValue,
    ValueType,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use test_log::test;

/// Builds a table in memory
fn build_table<H: HashStrategy>(
    config: Config,
    hasher: H,
    items: &[InternalValue],
) -> crate::Result<(Vec<u8>, Checksum)> {
    let mut builder = Builder::new(Vec::new(), config, hasher);

    for item in items {
        builder.add(&item.key.encode_into_vec(), &item.value)?;
    }
    assert_eq!(items.len(), builder.num_entries());

    let checksum = builder.finish()?;
    let file_size = builder.file_size();
    let bytes = builder.into_inner();

    assert_eq!(Some(bytes.len() as u64), file_size);

    Ok((bytes, checksum))
}

/// Parses the number out of keys like "keys105"
fn key_index(user_key: &[u8]) -> u64 {
    std::str::from_utf8(user_key)
        .ok()
        .and_then(|key| key.strip_prefix("keys"))
        .and_then(|idx| idx.parse::<u64>().ok())
        .unwrap_or_default()
        .saturating_sub(100)
}

/// Key #i is hashed to bucket `i * 10` by the first hash function, the
/// 11th key gets an assignment of its own.
fn scenario_hash(user_key: &[u8], probe: u32, _: u64) -> u64 {
    if user_key == b"keys110" {
        7 + u64::from(probe)
    } else {
        key_index(user_key) * 10 + u64::from(probe)
    }
}

fn scenario_items() -> Vec<InternalValue> {
    (100..110)
        .map(|i| {
            InternalValue::from_components(
                format!("keys{i}"),
                format!("value{i}"),
                1_000 + i,
                ValueType::Value,
            )
        })
        .collect()
}

#[test]
fn table_concrete_scenario() -> crate::Result<()> {
    let items = scenario_items();

    for block_size in [1, 5] {
        let config = Config::new(15, 8).cuckoo_block_size(block_size);
        let (bytes, _) = build_table(config, scenario_hash, &items)?;

        let reader = Reader::open(&bytes, bytes.len() as u64, scenario_hash)?;
        assert_eq!(10, reader.properties().item_count);

        for item in &items {
            let query = InternalKey::new(item.key.user_key.clone(), 0, ValueType::Value);
            assert_eq!(Some(item.clone()), reader.get(&query.encode_into_vec())?);
        }

        let missing = InternalKey::new("keys110", 5, ValueType::Value).encode_into_vec();
        assert_eq!(None, reader.get(&missing)?);
    }

    Ok(())
}

#[test]
fn table_all_keys_collide() -> crate::Result<()> {
    let items = scenario_items();
    let hasher = |_: &[u8], probe: u32, _: u64| u64::from(probe);

    let config = Config::new(15, 8)
        .cuckoo_block_size(1)
        .max_num_hash_funcs(10);

    let mut builder = Builder::new(Vec::new(), config, hasher);
    for item in &items {
        builder.add(&item.key.encode_into_vec(), &item.value)?;
    }
    builder.finish()?;
    assert_eq!(Some(10), builder.num_hash_funcs_used());

    let bytes = builder.into_inner();
    let reader = Reader::open(&bytes, bytes.len() as u64, hasher)?;
    assert_eq!(10, reader.properties().num_hash_funcs);

    for item in &items {
        assert_eq!(
            Some(item.clone()),
            reader.get(&item.key.encode_into_vec())?,
        );
    }

    // Every block of a missing key is full, so probing runs through all hash functions
    let missing = InternalKey::new("keys110", 0, ValueType::Value).encode_into_vec();
    assert_eq!(None, reader.get(&missing)?);

    Ok(())
}

#[test]
fn table_all_keys_collide_build_failure() -> crate::Result<()> {
    let hasher = |_: &[u8], probe: u32, _: u64| u64::from(probe);

    let config = Config::new(15, 8)
        .cuckoo_block_size(1)
        .max_num_hash_funcs(5);

    let result = build_table(config, hasher, &scenario_items());

    assert!(matches!(
        result,
        Err(crate::Error::Build(crate::BuildFailure::PlacementFailed {
            num_hash_funcs: 5
        })),
    ));

    Ok(())
}

struct CountingReader {
    bytes: Vec<u8>,
    reads: AtomicUsize,
}

impl ReadAt for CountingReader {
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<()> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.bytes.read_exact_at(buf, offset)
    }
}

#[test]
fn table_empty_slot_short_circuit() -> crate::Result<()> {
    let items = vec![InternalValue::from_components(
        "keys100",
        "value100",
        0,
        ValueType::Value,
    )];

    let config = Config::new(15, 8).cuckoo_block_size(1).hash_table_ratio(0.1);
    let (bytes, _) = build_table(config, scenario_hash, &items)?;

    let file = CountingReader {
        bytes,
        reads: AtomicUsize::new(0),
    };
    let reader = Reader::open(&file, file.bytes.len() as u64, scenario_hash)?;
    assert_eq!(2, reader.properties().num_hash_funcs);

    let before = file.reads.load(Ordering::Relaxed);
    let missing = InternalKey::new("keys110", 0, ValueType::Value).encode_into_vec();
    assert_eq!(None, reader.get(&missing)?);
    assert_eq!(1, file.reads.load(Ordering::Relaxed) - before);

    Ok(())
}

#[test]
fn table_undecodable_query_key() -> crate::Result<()> {
    let (bytes, _) = build_table(Config::new(15, 8), scenario_hash, &scenario_items())?;
    let reader = Reader::open(&bytes, bytes.len() as u64, scenario_hash)?;

    let err = reader.get(b"keys").unwrap_err();
    assert!(err.is_corruption());

    let mut bad_type = InternalKey::new("keys100", 0, ValueType::Value).encode_into_vec();
    if let Some(tag) = bad_type.get_mut(7) {
        *tag = 0x7F;
    }
    assert!(reader.get(&bad_type).unwrap_err().is_corruption());

    Ok(())
}

#[test]
fn table_query_other_key_length() -> crate::Result<()> {
    let (bytes, _) = build_table(Config::new(15, 8), scenario_hash, &scenario_items())?;
    let reader = Reader::open(&bytes, bytes.len() as u64, scenario_hash)?;

    let query = InternalKey::new("keys1000", 0, ValueType::Value).encode_into_vec();
    assert_eq!(None, reader.get(&query)?);

    let query = InternalKey::new("", 0, ValueType::Value).encode_into_vec();
    assert_eq!(None, reader.get(&query)?);

    Ok(())
}

#[test]
fn table_query_unused_key() -> crate::Result<()> {
    let (bytes, _) = build_table(Config::new(15, 8), scenario_hash, &scenario_items())?;
    let reader = Reader::open(&bytes, bytes.len() as u64, scenario_hash)?;

    let unused_key = reader.properties().unused_key.clone();
    assert_eq!(&[0u8; 7][..], crate::key::extract_user_key(&unused_key));

    assert_eq!(None, reader.get(&unused_key)?);

    Ok(())
}

#[test]
fn table_last_level() -> crate::Result<()> {
    let items = scenario_items()
        .into_iter()
        .map(|item| InternalValue::from_components(item.key.user_key, item.value, 0, ValueType::Value))
        .collect::<Vec<_>>();

    let config = Config::new(15, 8).last_level(true);
    let (bytes, _) = build_table(config, scenario_hash, &items)?;

    let reader = Reader::open(&bytes, bytes.len() as u64, scenario_hash)?;
    assert!(reader.properties().is_last_level);
    assert_eq!(7, reader.properties().key_length);

    for i in 100..110 {
        let item = reader
            .get(format!("keys{i}").as_bytes())?
            .expect("should exist");

        assert_eq!(0, item.key.seqno);
        assert_eq!(ValueType::Value, item.key.value_type);
        assert_eq!(format!("value{i}").as_bytes(), &*item.value);
    }

    assert_eq!(None, reader.get(b"keys110")?);

    // The full internal key is not a valid last-level key
    let internal_key = InternalKey::new("keys100", 0, ValueType::Value).encode_into_vec();
    assert_eq!(None, reader.get(&internal_key)?);

    Ok(())
}

#[test]
fn table_tombstones() -> crate::Result<()> {
    let items = vec![
        InternalValue::from_components("abc", *b"xy", 5, ValueType::Tombstone),
        InternalValue::from_components("def", *b"xy", 6, ValueType::WeakTombstone),
        InternalValue::from_components("ghi", *b"xy", 7, ValueType::Value),
    ];

    let hasher = crate::Xxh3HashStrategy::default();
    let (bytes, _) = build_table(Config::new(11, 2), hasher, &items)?;
    let reader = Reader::open(&bytes, bytes.len() as u64, hasher)?;

    for item in &items {
        let found = reader
            .get(&item.key.encode_into_vec())?
            .expect("should exist");

        assert_eq!(item, &found);
    }

    assert!(reader
        .get(&items[0].key.encode_into_vec())?
        .is_some_and(|item| item.is_tombstone()));

    Ok(())
}

#[test]
fn table_empty() -> crate::Result<()> {
    let hasher = crate::Xxh3HashStrategy::default();
    let (bytes, checksum) = build_table(Config::new(16, 4), hasher, &[])?;

    let reader = Reader::open(&bytes, bytes.len() as u64, hasher)?;
    assert_eq!(0, reader.properties().item_count);
    reader.verify_checksum(checksum)?;

    for i in 0..100u64 {
        let key = InternalKey::new(i.to_be_bytes(), 0, ValueType::Value).encode_into_vec();
        assert_eq!(None, reader.get(&key)?);
    }

    Ok(())
}

#[test]
fn table_reader_debug() -> crate::Result<()> {
    let hasher = crate::Xxh3HashStrategy::default();
    let (bytes, _) = build_table(Config::new(15, 8), hasher, &scenario_items())?;

    let reader = Reader::open(&bytes, bytes.len() as u64, hasher)?;
    assert_eq!(
        format!("CuckooTable({} bytes, 10 items)", bytes.len()),
        format!("{reader:?}"),
    );

    let err = Reader::open(&bytes[..10], 10, hasher).unwrap_err();
    assert!(err.is_corruption());

    Ok(())
}

#[test]
fn table_wrong_hasher_does_not_loop() -> crate::Result<()> {
    let (bytes, _) = build_table(Config::new(15, 8), scenario_hash, &scenario_items())?;

    // Tables do not know their hash strategy; a mismatch only causes misses
    let reader = Reader::open(&bytes, bytes.len() as u64, crate::Xxh3HashStrategy::default())?;

    for item in scenario_items() {
        let _ = reader.get(&item.key.encode_into_vec())?;
    }

    Ok(())
}
