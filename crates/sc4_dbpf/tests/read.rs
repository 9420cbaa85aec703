use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use sc4_dbpf::error::Error;
use sc4_dbpf::exemplar::{DataType, PropertyValue, EXEMPLAR_NAME};
use sc4_dbpf::{DbpfFile, Payload, Tgi, TgiKind};
use tracing::info;
use tracing_test::traced_test;
use walkdir::WalkDir;

fn resources() -> PathBuf {
    PathBuf::from(format!("{}/resources/", env!("CARGO_MANIFEST_DIR")))
}

fn fixtures() -> impl Iterator<Item = PathBuf> {
    WalkDir::new(resources())
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|path| path.is_file())
        .filter(|path| path.extension().is_some_and(|ext| ext == "dat"))
}

fn validate_dbpf(path: &Path) -> Result<(), Error> {
    info!("testing {}", path.display());

    let parent_dir = path.with_extension("");
    let expected_files = WalkDir::new(&parent_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| !e.file_type().is_dir())
        .collect::<Vec<_>>();

    let dbpf = DbpfFile::open(path)?;
    assert_eq!(dbpf.len(), expected_files.len());
    assert_eq!(dbpf.size(), std::fs::metadata(path)?.len());

    for entry in dbpf.iter() {
        let name = format!("{}.{}", entry.tgi(), entry.kind().extension());
        info!("comparing to {name}");

        let expected = std::fs::read(parent_dir.join(&name))?;
        let actual = entry.decompressed_data()?;

        assert_eq!(expected.len(), entry.decompressed_size() as usize);
        assert_eq!(expected, actual.as_ref());
    }

    Ok(())
}

#[traced_test]
#[test]
fn validate_dbpf_parsing() -> Result<(), Error> {
    let mut count = 0;
    for path in fixtures() {
        validate_dbpf(&path)?;
        count += 1;
    }
    assert!(count > 0);

    Ok(())
}

#[traced_test]
#[test]
fn decode_fixture() -> Result<(), Error> {
    let mut dbpf = DbpfFile::open(resources().join("parks.dat"))?;
    assert_eq!(dbpf.decode_all(), 0);
    assert!(dbpf.issues().is_empty());

    let kinds = dbpf.iter().map(|e| e.kind()).collect::<Vec<_>>();
    assert_eq!(
        kinds,
        vec![
            TgiKind::Exemplar,
            TgiKind::Cohort,
            TgiKind::LText,
            TgiKind::FshMisc,
            TgiKind::ExemplarRoad,
            TgiKind::Directory,
        ]
    );

    let park = dbpf.by_instance(1)?;
    assert!(park.is_compressed());
    let exemplar = park.exemplar().unwrap();
    assert_eq!(exemplar.parent_cohort, Tgi::new(0x0534_2861, 0x8A2B_3A15, 1));
    assert_eq!(exemplar.exemplar_type(), Some(0x0F));

    let name = exemplar.get(EXEMPLAR_NAME).unwrap();
    assert_eq!(name.data_type(), DataType::String);
    assert_eq!(name.repetition_count(), 20);
    assert_eq!(
        name.value,
        PropertyValue::String("DataView: Parks Aura".into())
    );

    let cohort = dbpf.by_instance(2)?.exemplar().unwrap();
    assert_eq!(cohort.exemplar_name(), Some("Park Cohort"));
    assert_eq!(
        cohort.get(0x2A49_9F85).map(|p| &p.value),
        Some(&PropertyValue::Float32(vec![1.5, 2.0]))
    );

    let text = dbpf.by_instance(3)?.text().unwrap();
    assert!(text.text.starts_with("Parks Aura: makes residents happier nearby."));

    assert_eq!(dbpf.by_instance(4)?.payload(), &Payload::Opaque);

    let directory = dbpf.by_tgi(&sc4_dbpf::tgi::DIRECTORY)?.directory().unwrap();
    assert_eq!(directory.len(), 2);
    for (tgi, size) in directory.iter() {
        assert_eq!(dbpf.by_tgi(tgi)?.decompressed_size(), *size);
    }

    Ok(())
}

#[traced_test]
#[test]
fn decode_hand_packed_fixture() -> Result<(), Error> {
    let mut dbpf = DbpfFile::open(resources().join("handpacked.dat"))?;
    assert_eq!(dbpf.by_instance(3)?.compressed_size(), 30);
    assert_eq!(dbpf.by_instance(4)?.compressed_size(), 300);
    assert_eq!(dbpf.decode_all(), 0);
    assert!(dbpf.issues().is_empty());

    let text = dbpf.by_instance(3)?;
    assert!(text.is_compressed());
    assert_eq!(text.text().map(|t| t.text.as_str()), Some("Parks Parks Parks"));

    let image = dbpf.by_instance(4)?;
    assert!(image.is_compressed());
    assert_eq!(image.decompressed_size(), 66_937);
    assert!(image.data().starts_with(b"SC4 QFS sample: abababaXSC4 QFS sample: abab"));
    assert!(image.data()[1_044..].starts_with(b"SC4 QFS sample: "));
    assert!(image.data().ends_with(b"bb!"));

    let directory = dbpf.by_tgi(&sc4_dbpf::tgi::DIRECTORY)?.directory().unwrap();
    assert_eq!(directory.get(&text.tgi()), Some(&38));
    assert_eq!(directory.get(&image.tgi()), Some(&66_937));

    Ok(())
}

#[traced_test]
#[test]
fn memo_is_not_compressed() -> Result<(), Error> {
    let mut dbpf = DbpfFile::open(resources().join("uncompressed.dat"))?;

    let memo = dbpf.by_index(0)?;
    assert!(memo.data().starts_with(b"MEMO\x10\xFB"));
    assert!(!memo.is_compressed());
    assert_eq!(memo.decompressed_size(), memo.compressed_size());

    assert_eq!(dbpf.decode_all(), 0);
    assert_eq!(
        dbpf.by_index(1)?.text().map(|t| t.text.as_str()),
        Some("Hello")
    );

    Ok(())
}
