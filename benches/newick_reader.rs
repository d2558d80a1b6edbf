use criterion::{
    BenchmarkId, Criterion, Throughput, criterion_group, criterion_main,
};
use dendros::config::{ReaderConfig, WriterConfig};
use dendros::{EventReader, NewickReader, NewickWriter, parse_newick};
use std::hint::black_box;
use std::path::PathBuf;

/// Balanced binary tree with `2^depth` tips, lengths and some metadata.
fn balanced_tree(depth: u32) -> String {
    fn subtree(depth: u32, next_tip: &mut usize) -> String {
        if depth == 0 {
            *next_tip += 1;
            return format!("T{next_tip}[&&NHX:S=Taxon_{next_tip}]:0.{next_tip}");
        }
        let left = subtree(depth - 1, next_tip);
        let right = subtree(depth - 1, next_tip);
        format!("({left},{right})[&posterior=0.95]:1.5")
    }
    let mut next_tip = 0;
    format!("{};", subtree(depth, &mut next_tip))
}

fn prepare_test_data() -> Vec<(String, String)> {
    [6, 10, 14]
        .into_iter()
        .map(|depth| (format!("balanced_{depth}"), balanced_tree(depth)))
        .collect()
}

fn bench_newick_reader(c: &mut Criterion) {
    let test_data = prepare_test_data();

    let mut group = c.benchmark_group("newick_reader");
    let _ = group.sample_size(30);

    for (name, newick_string) in &test_data {
        let _ = group.throughput(Throughput::Bytes(newick_string.len() as u64));

        let _ = group.bench_with_input(
            BenchmarkId::new("events", name),
            newick_string,
            |b, newick| {
                b.iter(|| {
                    let mut reader = NewickReader::new(
                        newick.as_bytes(),
                        ReaderConfig::default(),
                    );
                    let mut count = 0usize;
                    while let Ok(Some(event)) = reader.next_event() {
                        let _ = black_box(event);
                        count += 1;
                    }
                    black_box(count)
                });
            },
        );

        let _ = group.bench_with_input(
            BenchmarkId::new("parse_newick", name),
            newick_string,
            |b, newick| {
                b.iter(|| {
                    let _ = black_box(parse_newick(newick));
                });
            },
        );
    }

    group.finish();
}

fn bench_newick_writer(c: &mut Criterion) {
    let test_data = prepare_test_data();
    let config = WriterConfig::default();

    let mut group = c.benchmark_group("newick_writer");
    let _ = group.sample_size(30);

    for (name, newick_string) in &test_data {
        let Ok(trees) = parse_newick(newick_string) else {
            continue;
        };
        let tree = &trees[0];
        let _ = group.bench_function(BenchmarkId::new("write_tree", name), |b| {
            b.iter(|| {
                let mut writer = NewickWriter::new();
                let mut output: Vec<u8> = Vec::new();
                let _ = black_box(
                    writer.write_tree(tree, tree, tree, &mut output, &config),
                );
                black_box(output.len())
            });
        });
    }

    group.finish();
}

criterion_group!(
    name = benches;
    config = {
        let mut criterion = Criterion::default();
        let benchmark_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("benchmark_results");
        criterion = criterion.output_directory(&benchmark_dir);
        criterion = criterion.warm_up_time(std::time::Duration::from_millis(500));
        criterion = criterion.measurement_time(std::time::Duration::from_secs(5));
        criterion
    };
    targets = bench_newick_reader, bench_newick_writer
);
criterion_main!(benches);
