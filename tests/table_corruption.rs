use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use cuckoo_table::{
    coding::Encode, Builder, Config, InternalKey, Reader, ValueType, Xxh3HashStrategy,
};
use std::{collections::BTreeMap, io::Read};
use test_log::test;

const FOOTER_SIZE: usize = 28;

/// Builds a table with 1-byte user keys `a..=z`.
fn build_table() -> cuckoo_table::Result<Vec<u8>> {
    let mut builder = Builder::new(Vec::new(), Config::new(9, 4), Xxh3HashStrategy::default());

    for (idx, key) in ('a'..='z').enumerate() {
        let key = InternalKey::new(key.to_string(), idx as u64, ValueType::Value);
        builder.add(&key.encode_into_vec(), b"abcd")?;
    }
    builder.finish()?;

    Ok(builder.into_inner())
}

fn open(bytes: &[u8]) -> cuckoo_table::Result<Reader<&[u8], Xxh3HashStrategy>> {
    Reader::open(bytes, bytes.len() as u64, Xxh3HashStrategy::default())
}

/// Decodes the properties block and hands it to `f`, then writes back a
/// consistent properties block and footer.
fn rewrite_properties(
    bytes: &[u8],
    f: impl FnOnce(&mut BTreeMap<String, Vec<u8>>),
) -> std::io::Result<Vec<u8>> {
    let (data, footer) = bytes.split_at(bytes.len() - FOOTER_SIZE);

    let mut reader = footer;
    let properties_offset = reader.read_u64::<LittleEndian>()?;
    let properties_len = reader.read_u32::<LittleEndian>()?;
    let _checksum = reader.read_u64::<LittleEndian>()?;
    let magic = reader.to_vec();

    let (buckets, properties) = data.split_at(properties_offset as usize);
    assert_eq!(properties_len as usize, properties.len());

    let mut reader = properties;
    let mut map = BTreeMap::new();

    for _ in 0..reader.read_u32::<LittleEndian>()? {
        let mut name = vec![0; reader.read_u16::<LittleEndian>()?.into()];
        reader.read_exact(&mut name)?;

        let mut value = vec![0; reader.read_u32::<LittleEndian>()? as usize];
        reader.read_exact(&mut value)?;

        map.insert(String::from_utf8(name).expect("should be utf-8"), value);
    }

    f(&mut map);

    let mut properties = vec![];
    properties.write_u32::<LittleEndian>(map.len() as u32)?;
    for (name, value) in &map {
        properties.write_u16::<LittleEndian>(name.len() as u16)?;
        properties.extend_from_slice(name.as_bytes());
        properties.write_u32::<LittleEndian>(value.len() as u32)?;
        properties.extend_from_slice(value);
    }

    let mut out = buckets.to_vec();
    out.extend_from_slice(&properties);
    out.write_u64::<LittleEndian>(properties_offset)?;
    out.write_u32::<LittleEndian>(properties.len() as u32)?;
    out.write_u64::<LittleEndian>(xxhash_rust::xxh3::xxh3_64(&properties))?;
    out.extend_from_slice(&magic);

    Ok(out)
}

#[test]
fn table_corruption_unchanged_rewrite() -> cuckoo_table::Result<()> {
    let bytes = build_table()?;

    // Sanity check for the test helper
    let rewritten = rewrite_properties(&bytes, |_| {})?;
    assert_eq!(bytes, rewritten);

    open(&rewritten)?;

    Ok(())
}

#[test]
fn table_corruption_bad_magic() -> cuckoo_table::Result<()> {
    let mut bytes = build_table()?;

    if let Some(byte) = bytes.last_mut() {
        *byte ^= 0xFF;
    }

    assert!(open(&bytes).unwrap_err().is_corruption());

    Ok(())
}

#[test]
fn table_corruption_truncated() -> cuckoo_table::Result<()> {
    let bytes = build_table()?;

    for len in [0, 1, FOOTER_SIZE - 1, FOOTER_SIZE, bytes.len() / 2, bytes.len() - 1] {
        assert!(
            open(&bytes[..len]).unwrap_err().is_corruption(),
            "table truncated to {len} bytes should be rejected",
        );
    }

    // Cut off the start of the bucket array
    assert!(open(&bytes[1..]).unwrap_err().is_corruption());

    Ok(())
}

#[test]
fn table_corruption_declared_size_too_large() -> cuckoo_table::Result<()> {
    let bytes = build_table()?;

    let result = Reader::open(
        bytes.as_slice(),
        bytes.len() as u64 + 100,
        Xxh3HashStrategy::default(),
    );
    assert!(result.unwrap_err().is_corruption());

    Ok(())
}

#[test]
fn table_corruption_flipped_properties_byte() -> cuckoo_table::Result<()> {
    let bytes = build_table()?;
    let properties_offset = {
        let mut footer = &bytes[bytes.len() - FOOTER_SIZE..];
        footer.read_u64::<LittleEndian>()? as usize
    };

    for offset in properties_offset..bytes.len() - FOOTER_SIZE {
        let mut bytes = bytes.clone();
        bytes[offset] ^= 0x01;

        assert!(
            matches!(
                open(&bytes),
                Err(cuckoo_table::Error::ChecksumMismatch { .. }),
            ),
            "flipped byte at {offset} should be detected",
        );
    }

    Ok(())
}

#[test]
fn table_corruption_missing_property() -> cuckoo_table::Result<()> {
    let bytes = build_table()?;

    for name in [
        "cuckoo_block_size",
        "format_version",
        "hash_table_ratio",
        "is_last_level",
        "item_count",
        "key_length",
        "num_buckets",
        "num_hash_funcs",
        "unused_key",
        "value_length",
    ] {
        let bytes = rewrite_properties(&bytes, |props| {
            assert!(props.remove(name).is_some());
        })?;

        assert!(
            open(&bytes).unwrap_err().is_corruption(),
            "table without {name:?} should be rejected",
        );
    }

    // Purely informational
    let bytes = rewrite_properties(&bytes, |props| {
        props.remove("created_at");
        props.remove("crate_version");
    })?;
    open(&bytes)?;

    Ok(())
}

#[test]
fn table_corruption_inconsistent_properties() -> cuckoo_table::Result<()> {
    let bytes = build_table()?;

    let cases: [(&str, Vec<u8>); 7] = [
        ("format_version", vec![2]),
        ("is_last_level", vec![2]),
        ("num_hash_funcs", 0u32.to_le_bytes().to_vec()),
        ("cuckoo_block_size", 0u32.to_le_bytes().to_vec()),
        ("hash_table_ratio", 1.5f64.to_le_bytes().to_vec()),
        ("unused_key", vec![0; 3]),
        ("num_buckets", 1_000u64.to_le_bytes().to_vec()),
    ];

    for (name, value) in cases {
        let bytes = rewrite_properties(&bytes, |props| {
            props.insert(name.to_owned(), value.clone());
        })?;

        assert!(
            open(&bytes).unwrap_err().is_corruption(),
            "table with {name:?} = {value:?} should be rejected",
        );
    }

    Ok(())
}

#[test]
fn table_corruption_bucket() -> cuckoo_table::Result<()> {
    let mut bytes = build_table()?;
    let slot_len = 9 + 4;

    let slot_count = {
        let props = open(&bytes)?.properties().clone();
        props.num_buckets + u64::from(props.cuckoo_block_size) - 1
    };

    // Find the bucket of "q", and break its value type
    let slot = (0..slot_count as usize)
        .map(|slot| slot * slot_len)
        .find(|&offset| bytes[offset] == b'q')
        .expect("should exist");
    bytes[slot + 1] = 0x7F;

    let reader = open(&bytes)?;

    let query = InternalKey::new("q", 0, ValueType::Value).encode_into_vec();
    assert!(reader.get(&query).unwrap_err().is_corruption());

    let query = InternalKey::new("r", 0, ValueType::Value).encode_into_vec();
    assert!(reader.get(&query)?.is_some());

    Ok(())
}
