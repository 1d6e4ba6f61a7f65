use criterion::{black_box, criterion_group, criterion_main, Criterion};

use lib::eval::params::CombinedParams;
use lib::eval::EvalTable;
use lib::general::move_list::Moves;
use lib::search::maximax::Maximax;
use lib::search::pvs::Pvs;
use lib::search::{packed_from_startpos, Strategy};

fn enumeration_bench(c: &mut Criterion) {
    let table = EvalTable::new(&CombinedParams::default()).unwrap();
    let root = packed_from_startpos(&table);
    let mut buf = Moves::default();
    c.bench_function("enumerate startpos", |b| {
        b.iter(|| {
            root.available_moves_into(black_box(&mut buf), false);
            buf.len()
        })
    });
}

fn search_bench(c: &mut Criterion) {
    let table = EvalTable::new(&CombinedParams::default()).unwrap();
    let root = packed_from_startpos(&table);
    let mut maximax = Maximax::new(0);
    c.bench_function("maximax depth 3", |b| {
        b.iter(|| maximax.pick_move(black_box(&root), &table, 3))
    });
    let mut pvs = Pvs::new();
    c.bench_function("pvs depth 3", |b| {
        b.iter(|| pvs.pick_move(black_box(&root), &table, 3))
    });
}

criterion_group!(benches, enumeration_bench, search_bench);
criterion_main!(benches);
