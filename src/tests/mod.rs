mod descriptors;

use crate::android::ApkFile;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Packs `(name, data)` pairs into an in-memory ZIP, in the given order.
pub(crate) fn apk_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    pack(entries, SimpleFileOptions::default())
}

/// Like [`apk_bytes`] but without compression, so entry data sits verbatim in the archive.
pub(crate) fn stored_apk_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    pack(
        entries,
        SimpleFileOptions::default().compression_method(CompressionMethod::Stored),
    )
}

/// Flips one byte inside the first occurrence of `payload`, breaking that entry's CRC.
pub(crate) fn corrupt(archive: &mut [u8], payload: &[u8]) {
    let at = archive
        .windows(payload.len())
        .position(|w| w == payload)
        .unwrap();
    archive[at + payload.len() / 2] ^= 0xff;
}

fn pack(entries: &[(&str, &[u8])], options: SimpleFileOptions) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

#[test]
fn apk_helper_writes_entries_in_order() {
    let bytes = apk_bytes(&[("b.dex", b"b"), ("a.dex", b"a")]);
    let apk = ApkFile::from_bytes(&bytes).unwrap();
    let names: Vec<&str> = apk.dex_entries().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["b.dex", "a.dex"]);
}
