use core_permission::{Config, GroupId, PermissionTree};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// A chain of `depth` nested groups, each holding `width` permissions
fn create_deep_tree(depth: usize, width: usize) -> PermissionTree {
    let mut tree = PermissionTree::new();
    let mut group = GroupId::ROOT;
    for d in 0..depth {
        group = tree.add_group(group, format!("g{}", d)).unwrap();
        for w in 0..width {
            tree.add_permission(group, format!("p{}", w)).unwrap();
        }
    }
    tree
}

/// Path to the last permission of the deepest group
fn deep_path(depth: usize, width: usize) -> String {
    let groups: Vec<String> = (0..depth).map(|d| format!("g{}", d)).collect();
    format!("{}.p{}", groups.join("."), width - 1)
}

fn benchmark_exact_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_exact_depth");
    let config = Config::new();

    for depth in [1, 4, 16, 64].iter() {
        let tree = create_deep_tree(*depth, 8);
        let path = deep_path(*depth, 8);
        group.bench_with_input(BenchmarkId::from_parameter(depth), depth, |b, _| {
            b.iter(|| tree.find_permissions_from_path(&config, black_box(&path)));
        });
    }

    group.finish();
}

fn benchmark_wildcard_resolution(c: &mut Criterion) {
    let tree = create_deep_tree(16, 32);
    let config = Config::new();

    c.bench_function("resolve_children_wildcard", |b| {
        b.iter(|| tree.find_permissions_from_path(&config, black_box("g0.*")));
    });

    c.bench_function("resolve_subtree_wildcard", |b| {
        b.iter(|| tree.find_permissions_from_path(&config, black_box("g0.**.*")));
    });
}

fn benchmark_namespaced_resolution(c: &mut Criterion) {
    let tree = create_deep_tree(4, 8);
    let mut config = Config::new();
    config.set_namespace("app");
    let path = format!("app:{}", deep_path(4, 8));

    c.bench_function("resolve_namespaced", |b| {
        b.iter(|| tree.find_permissions_from_path(&config, black_box(&path)));
    });
}

criterion_group!(
    benches,
    benchmark_exact_resolution,
    benchmark_wildcard_resolution,
    benchmark_namespaced_resolution
);
criterion_main!(benches);
