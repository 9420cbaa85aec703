use std::io::Cursor;
use std::path::PathBuf;

use pretty_assertions::assert_eq;
use sc4_dbpf::error::Error;
use sc4_dbpf::exemplar::{Property, PropertyValue};
use sc4_dbpf::tgi::DIRECTORY;
use sc4_dbpf::{DbpfFile, Entry, SaveOptions, Tgi};
use tracing::info;
use tracing_test::traced_test;
use walkdir::WalkDir;

fn resources() -> PathBuf {
    PathBuf::from(format!("{}/resources/", env!("CARGO_MANIFEST_DIR")))
}

fn written(dbpf: &mut DbpfFile) -> Result<DbpfFile, Error> {
    let mut buffer = Cursor::new(Vec::new());
    dbpf.write(
        &mut buffer,
        SaveOptions::builder().update_timestamp(false).build(),
    )?;
    DbpfFile::from_bytes(buffer.get_ref())
}

#[traced_test]
#[test]
fn rewrite_unchanged() -> Result<(), Error> {
    let mut original = DbpfFile::open(resources().join("parks.dat"))?;
    let reread = written(&mut original)?;

    assert_eq!(reread.header(), original.header());
    assert_eq!(reread.tgis().collect::<Vec<_>>(), original.tgis().collect::<Vec<_>>());
    for (a, b) in original.iter().zip(reread.iter()) {
        assert_eq!(a.data(), b.data());
        assert_eq!(a.is_compressed(), b.is_compressed());
    }

    Ok(())
}

#[traced_test]
#[test]
fn rewrite_reencoded() -> Result<(), Error> {
    let mut original = DbpfFile::open(resources().join("parks.dat"))?;
    assert_eq!(original.decode_all(), 0);
    assert_eq!(original.encode_all(), 0);

    let mut reread = written(&mut original)?;
    assert_eq!(reread.decode_all(), 0);
    assert!(reread.issues().is_empty());

    for (a, b) in original.iter().zip(reread.iter()) {
        info!("comparing {}", a.tgi());
        assert_eq!(a.tgi(), b.tgi());
        assert_eq!(a.is_compressed(), b.is_compressed());
        assert_eq!(a.decompressed_size(), b.decompressed_size());
        assert_eq!(a.payload(), b.payload());
    }

    let directory = reread.by_tgi(&DIRECTORY)?.directory().unwrap();
    for (tgi, size) in directory.iter() {
        assert!(reread.by_tgi(tgi)?.is_compressed());
        assert_eq!(reread.by_tgi(tgi)?.decompressed_size(), *size);
    }

    Ok(())
}

#[traced_test]
#[test]
fn edit_exemplar() -> Result<(), Error> {
    let mut dbpf = DbpfFile::open(resources().join("parks.dat"))?;
    let tgi = dbpf.by_instance(1)?.tgi();

    let entry = dbpf.by_tgi_mut(&tgi)?;
    entry.decode()?;
    let exemplar = entry.exemplar_mut().unwrap();
    exemplar.insert(Property::new(
        0x2000_0001,
        PropertyValue::String("Bigger park".into()),
    ));
    entry.encode(true)?;

    let mut reread = written(&mut dbpf)?;
    let entry = reread.by_tgi_mut(&tgi)?;
    assert!(entry.is_compressed());
    entry.decode()?;
    assert_eq!(
        entry.exemplar().and_then(|e| e.get(0x2000_0001)).map(|p| &p.value),
        Some(&PropertyValue::String("Bigger park".into()))
    );

    let size = entry.decompressed_size();
    reread.by_tgi_mut(&DIRECTORY)?.decode()?;
    let directory = reread.by_tgi(&DIRECTORY)?.directory().unwrap();
    assert_eq!(directory.get(&tgi), Some(&size));

    Ok(())
}

#[traced_test]
#[test]
fn build_from_folder() -> Result<(), Error> {
    let folder = resources().join("parks");
    let mut dbpf = DbpfFile::create();

    let mut files = WalkDir::new(&folder)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect::<Vec<_>>();
    files.sort();

    for path in files {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let tgi: Tgi = stem.parse().map_err(|e| Error::CustomError(format!("{e}")))?;
        if tgi == DIRECTORY {
            continue;
        }

        let mut entry = Entry::from_bytes(tgi, std::fs::read(&path)?);
        entry.set_compressed(entry.decompressed_size() > 256)?;
        dbpf.add_entry(entry);
    }
    dbpf.update_directory()?;

    let mut reread = written(&mut dbpf)?;
    assert_eq!(reread.len(), 6);
    assert_eq!(reread.decode_all(), 0);

    let compressed = reread
        .iter()
        .filter(|e| e.is_compressed())
        .map(|e| e.tgi())
        .collect::<Vec<_>>();
    let directory = reread.by_tgi(&DIRECTORY)?.directory().unwrap();
    assert_eq!(directory.keys().copied().collect::<Vec<_>>(), compressed);

    for entry in reread.iter().filter(|e| e.tgi() != DIRECTORY) {
        let name = format!("{}.{}", entry.tgi(), entry.kind().extension());
        let expected = std::fs::read(folder.join(name))?;
        assert_eq!(entry.data(), expected.as_slice());
    }

    Ok(())
}
