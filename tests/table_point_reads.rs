use cuckoo_table::{
    coding::Encode, Builder, Config, InternalKey, Reader, ValueType, Xxh3HashStrategy,
};
use test_log::test;

const ITEM_COUNT: u64 = 1_000;

fn internal_key(user_key: impl AsRef<[u8]>, seqno: u64) -> Vec<u8> {
    InternalKey::new(user_key.as_ref(), seqno, ValueType::Value).encode_into_vec()
}

#[test]
fn table_point_reads() -> cuckoo_table::Result<()> {
    let folder = cuckoo_table::get_tmp_folder();
    let path = folder.path().join("table");

    let hasher = Xxh3HashStrategy::default();

    let mut builder = Builder::create(&path, Config::new(16, 8), hasher)?;
    for x in 0..ITEM_COUNT {
        builder.add(&internal_key(x.to_be_bytes(), x), &(x * 2).to_le_bytes())?;
    }
    assert_eq!(ITEM_COUNT as usize, builder.num_entries());

    builder.finish()?;
    let num_hash_funcs = builder.num_hash_funcs_used();
    builder.close()?;

    let reader = Reader::open_path(&path, hasher)?;
    assert_eq!(ITEM_COUNT, reader.properties().item_count);
    assert_eq!(num_hash_funcs, Some(reader.properties().num_hash_funcs));

    for x in 0..ITEM_COUNT {
        let item = reader
            .get(&internal_key(x.to_be_bytes(), 0))?
            .unwrap_or_else(|| panic!("{x} not found"));

        assert_eq!(x, item.key.seqno);
        assert_eq!(&x.to_be_bytes(), &*item.key.user_key);
        assert_eq!(&(x * 2).to_le_bytes(), &*item.value);
    }

    for x in ITEM_COUNT..ITEM_COUNT * 2 {
        assert!(reader.get(&internal_key(x.to_be_bytes(), 0))?.is_none());
    }

    Ok(())
}

#[test]
fn table_point_reads_configs() -> cuckoo_table::Result<()> {
    for (ratio, block_size) in [(0.5, 1), (0.9, 1), (0.9, 5), (1.0, 8), (0.75, 3)] {
        let hasher = Xxh3HashStrategy::with_seed(42);
        let config = Config::new(12, 4)
            .hash_table_ratio(ratio)
            .cuckoo_block_size(block_size);

        let mut builder = Builder::new(Vec::new(), config, hasher);
        for x in 0..500u32 {
            builder.add(&internal_key(x.to_be_bytes(), 7), &x.to_le_bytes())?;
        }
        builder.finish()?;

        let bytes = builder.into_inner();
        let reader = Reader::open(bytes.as_slice(), bytes.len() as u64, hasher)?;

        let props = reader.properties();
        assert_eq!(block_size, props.cuckoo_block_size);
        assert_eq!(0, props.num_buckets % u64::from(block_size));
        assert!(props.num_buckets as f64 >= 500.0 / ratio);

        for x in 0..500u32 {
            let item = reader
                .get(&internal_key(x.to_be_bytes(), 0))?
                .unwrap_or_else(|| panic!("{x} not found with ratio={ratio}, block size={block_size}"));
            assert_eq!(&x.to_le_bytes(), &*item.value);
        }

        for x in 500..1_000u32 {
            assert!(reader.get(&internal_key(x.to_be_bytes(), 0))?.is_none());
        }
    }

    Ok(())
}

/// Key #i is hashed to bucket `i * 10` by the first hash function
fn scenario_hash(user_key: &[u8], probe: u32, _: u64) -> u64 {
    let idx = std::str::from_utf8(user_key)
        .ok()
        .and_then(|key| key.strip_prefix("keys"))
        .and_then(|idx| idx.parse::<u64>().ok())
        .unwrap_or_default();

    if idx == 110 {
        3 + u64::from(probe)
    } else {
        idx.saturating_sub(100) * 10 + u64::from(probe)
    }
}

fn colliding_hash(_: &[u8], probe: u32, _: u64) -> u64 {
    u64::from(probe)
}

fn build_scenario<H: cuckoo_table::HashStrategy>(
    config: Config,
    hasher: H,
) -> cuckoo_table::Result<Vec<u8>> {
    let mut builder = Builder::new(Vec::new(), config, hasher);

    for i in 100..110 {
        builder.add(
            &internal_key(format!("keys{i}"), 1_000 + i),
            format!("value{i}").as_bytes(),
        )?;
    }
    builder.finish()?;

    Ok(builder.into_inner())
}

#[test]
fn table_point_reads_concrete_scenario() -> cuckoo_table::Result<()> {
    let config = Config::new(15, 8).hash_table_ratio(0.9);
    let bytes = build_scenario(config.clone(), scenario_hash)?;
    let reader = Reader::open(&bytes, bytes.len() as u64, scenario_hash)?;

    let config = config.cuckoo_block_size(1).max_num_hash_funcs(10);
    let colliding = build_scenario(config, colliding_hash)?;
    let colliding_reader = Reader::open(&colliding, colliding.len() as u64, colliding_hash)?;
    assert_eq!(10, colliding_reader.properties().num_hash_funcs);

    for i in 100..110 {
        let key = internal_key(format!("keys{i}"), 0);

        let item = reader.get(&key)?.expect("should exist");
        assert_eq!(1_000 + i, item.key.seqno);
        assert_eq!(format!("value{i}").as_bytes(), &*item.value);

        assert_eq!(Some(item), colliding_reader.get(&key)?);
    }

    assert_eq!(None, reader.get(&internal_key("keys110", 0))?);
    assert_eq!(None, colliding_reader.get(&internal_key("keys110", 0))?);

    Ok(())
}
