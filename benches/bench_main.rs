use basalt::attacks::AttackTables;
use basalt::movegen;
use basalt::moves::MoveList;
use basalt::perft::perft;
use basalt::position::Position;
use basalt::tt::{Bound, TranspositionTable};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_perft(c: &mut Criterion) {
    let tables = AttackTables::new();
    let mut group = c.benchmark_group("perft");
    let mut position = Position::startpos();
    group.bench_function("startpos_depth3", |b| {
        b.iter(|| perft(black_box(&mut position), &tables, 3))
    });
    group.finish();
}

fn bench_do_undo(c: &mut Criterion) {
    let tables = AttackTables::new();
    let mut group = c.benchmark_group("position");
    let mut position = Position::from_fen(
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    )
    .unwrap();
    let mut list = MoveList::new();
    movegen::generate_pseudo_moves(&position, &tables, &mut list);
    let mv = list.moves[0];

    group.bench_function("do_undo_kiwipete", |b| {
        b.iter(|| {
            if position.do_move(&tables, black_box(mv)) {
                position.undo_move();
            }
        })
    });

    group.bench_function("generate_moves_kiwipete", |b| {
        b.iter(|| {
            let mut list = MoveList::new();
            movegen::generate_pseudo_moves(black_box(&position), &tables, &mut list);
            list.count
        })
    });
    group.finish();
}

fn bench_tt(c: &mut Criterion) {
    let mut group = c.benchmark_group("tt");
    let mut table = TranspositionTable::new(16);
    let position = Position::startpos();

    group.bench_function("probe_empty", |b| {
        b.iter(|| table.probe(black_box(position.key())))
    });

    table.store(position.key(), 5, 100, Bound::Exact, basalt::moves::NO_MOVE);
    group.bench_function("probe_hit", |b| {
        b.iter(|| table.probe(black_box(position.key())))
    });
    group.finish();
}

criterion_group!(benches, bench_perft, bench_do_undo, bench_tt);
criterion_main!(benches);
