use divan::AllocProfiler;

#[global_allocator]
static ALLOC: AllocProfiler = AllocProfiler::system();

fn main() {
    divan::main();
}

fn get_input() -> Vec<u8> {
    std::fs::read(format!("{}/resources/parks.dat", env!("CARGO_MANIFEST_DIR"))).unwrap()
}

pub mod qfs {
    use divan::Bencher;
    use sc4_dbpf::qfs;

    fn sample() -> Vec<u8> {
        let mut data = super::get_input();
        data.extend_from_slice(&super::get_input());
        data.extend((0..4096u32).map(|i| (i * 7 % 251) as u8));
        data
    }

    #[divan::bench]
    fn compress(bencher: Bencher) {
        bencher.with_inputs(sample).bench_refs(|data| {
            divan::black_box(qfs::compress(data).unwrap());
        });
    }

    #[divan::bench]
    fn decompress(bencher: Bencher) {
        bencher
            .with_inputs(|| qfs::compress(&sample()).unwrap())
            .bench_refs(|data| {
                divan::black_box(qfs::decompress(data).unwrap());
            });
    }
}

pub mod read {
    use divan::Bencher;
    use sc4_dbpf::DbpfFile;

    #[divan::bench]
    fn open(bencher: Bencher) {
        bencher.with_inputs(super::get_input).bench_refs(|data| {
            divan::black_box(DbpfFile::from_bytes(data).unwrap());
        });
    }

    #[divan::bench(sample_count = 1)]
    fn decode_all(bencher: Bencher) {
        bencher
            .with_inputs(|| DbpfFile::from_bytes(&super::get_input()).unwrap())
            .bench_refs(|dbpf| {
                divan::black_box(dbpf.decode_all());
            });
    }
}
