#![no_main]
use cuckoo_table::{Reader, Xxh3HashStrategy};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let (file, queries) = data.split_at(data.len() / 2);

    if let Ok(reader) = Reader::open(file, file.len() as u64, Xxh3HashStrategy::default()) {
        for query in queries.chunks(reader.properties().key_length.max(1) as usize) {
            let _ = reader.get(query);
        }

        let _ = reader.checksum();
    }
});
