use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use useradmin_auth::{AuthorizationResolver, MembershipKind, Role, RoleArena};
use useradmin_core::{AttributeValue, RoleKind, RoleName};
use useradmin_credentials::{
    CredentialConfig, CredentialDecryptor, CredentialEncryptor, CredentialVerifier, HashAlgorithm,
};
use useradmin_infra::UserAdmin;

fn name(s: &str) -> RoleName {
    RoleName::new(s).unwrap()
}

/// `user` at the bottom of a chain of `depth` nested groups.
fn nested_chain(depth: usize) -> RoleArena {
    let mut arena = RoleArena::new();
    arena.insert(Role::user(name("user")));
    let mut below = name("user");
    for i in 0..depth {
        let mut group = Role::group(name(&format!("g{i}")));
        group.add_member(below, MembershipKind::Basic).unwrap();
        below = group.name().clone();
        arena.insert(group);
    }
    arena
}

/// `size` groups where every group lists every other group; the user is in none.
fn dense_cycle(size: usize) -> RoleArena {
    let mut arena = RoleArena::new();
    arena.insert(Role::user(name("outsider")));
    let names: Vec<RoleName> = (0..size).map(|i| name(&format!("g{i}"))).collect();
    for n in &names {
        let mut group = Role::group(n.clone());
        for other in names.iter().filter(|o| *o != n) {
            group.add_member(other.clone(), MembershipKind::Basic).unwrap();
        }
        arena.insert(group);
    }
    arena
}

fn bench_nested_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("nested_group_resolution");

    for depth in [1usize, 10, 100].iter() {
        let arena = nested_chain(*depth);
        let top = format!("g{}", depth - 1);
        group.throughput(Throughput::Elements(*depth as u64));
        group.bench_with_input(BenchmarkId::new("is_implied_by", depth), depth, |b, _| {
            let resolver = AuthorizationResolver::new(&arena);
            b.iter(|| black_box(resolver.is_implied_by(&top, Some("user"))));
        });
        group.bench_with_input(BenchmarkId::new("authorization", depth), depth, |b, _| {
            let resolver = AuthorizationResolver::new(&arena);
            let user = name("user");
            b.iter(|| black_box(resolver.authorization(Some(&user))));
        });
    }

    group.finish();
}

fn bench_cyclic_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("cyclic_group_resolution");

    for size in [4usize, 8, 12].iter() {
        let arena = dense_cycle(*size);
        group.bench_with_input(BenchmarkId::new("outsider", size), size, |b, _| {
            let resolver = AuthorizationResolver::new(&arena);
            let user = name("outsider");
            b.iter(|| black_box(resolver.authorization(Some(&user))));
        });
    }

    group.finish();
}

fn bench_credentials(c: &mut Criterion) {
    let mut group = c.benchmark_group("credential_verification");
    let value = AttributeValue::from("correct horse battery staple");

    for algorithm in [HashAlgorithm::Sha256, HashAlgorithm::Sha512] {
        let verifier =
            CredentialVerifier::new(CredentialConfig::default().with_hash_algorithm(algorithm))
                .unwrap();
        let record = verifier.encrypt("pwd", &value).unwrap();

        group.bench_function(BenchmarkId::new("encrypt", algorithm), |b| {
            b.iter(|| black_box(verifier.encrypt("pwd", &value).unwrap()));
        });
        group.bench_function(BenchmarkId::new("verify", algorithm), |b| {
            b.iter(|| black_box(verifier.verify("pwd", &value, &record).unwrap()));
        });
    }

    group.finish();
}

fn bench_facade_authorization(c: &mut Criterion) {
    let mut group = c.benchmark_group("facade_authorization");

    let admin = UserAdmin::in_memory().unwrap();
    let alice = admin.create_role("alice", RoleKind::User).unwrap().unwrap();
    for i in 0..50 {
        let g = admin
            .create_role(&format!("team{i}"), RoleKind::Group)
            .unwrap()
            .unwrap();
        if i % 2 == 0 {
            g.add_member(&alice).unwrap();
        }
    }

    group.bench_function("get_authorization_50_groups", |b| {
        b.iter(|| black_box(admin.get_authorization(Some(&alice)).unwrap()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_nested_resolution,
    bench_cyclic_resolution,
    bench_credentials,
    bench_facade_authorization
);
criterion_main!(benches);
