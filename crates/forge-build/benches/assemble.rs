//! Shadow assembly benchmarks
//!
//! Measures relocation of class constant pools and the full merge of an
//! owned module with a relocated third-party library of growing size.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use forge_build::shadow::{merge, Archive, AssemblyInputs, MergeTarget, Relocator};
use forge_build::{DependencyCoordinate, MergeSpec, RelocationRule};
use semver::Version;

fn class_file(strings: &[String]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 52]);
    bytes.extend_from_slice(&(strings.len() as u16 + 1).to_be_bytes());
    for s in strings {
        bytes.push(1);
        bytes.extend_from_slice(&(s.len() as u16).to_be_bytes());
        bytes.extend_from_slice(s.as_bytes());
    }
    bytes.extend_from_slice(&[0x00, 0x21, 0, 1, 0, 0]);
    bytes.extend_from_slice(&[0; 8]);
    bytes
}

fn library(classes: usize) -> Archive {
    (0..classes)
        .map(|i| {
            let name = format!("com/libx/pkg{}/Type{}", i % 16, i);
            let strings = vec![
                name.clone(),
                format!("(Lcom/libx/pkg0/Type0;)L{};", name),
                "java/lang/Object".to_string(),
                format!("com.libx.pkg{}.Type{}", i % 16, i),
            ];
            (format!("{}.class", name), class_file(&strings))
        })
        .collect()
}

fn owned() -> Archive {
    Archive::new()
        .with_entry(
            "com/example/Main.class",
            class_file(&["com/example/Main".to_string(), "com/libx/pkg0/Type0".to_string()]),
        )
        .with_entry("plugin.yml", b"main: com.example.Main\n".to_vec())
}

// ============================================================================
// Relocation
// ============================================================================

fn bench_relocate_class(c: &mut Criterion) {
    let rule = RelocationRule::new("com.libx", "com.example.shaded.libx");
    let relocator = Relocator::new([&rule]);
    let bytes = library(1)
        .iter()
        .map(|(_, bytes)| bytes.to_vec())
        .next()
        .unwrap_or_default();

    c.bench_function("relocate_single_class", |b| {
        b.iter(|| relocator.relocate_entry(black_box("com/libx/pkg0/Type0.class"), black_box(&bytes)))
    });
}

// ============================================================================
// Full merge
// ============================================================================

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_relocated_library");
    let lib = DependencyCoordinate::new("com.libx", "libx", "1.0");
    let target = MergeTarget::new("dist", Version::new(1, 0, 0));
    let spec = MergeSpec::conventional()
        .include_module("core")
        .include_dependency(lib.clone())
        .relocate(RelocationRule::new("com.libx", "com.example.shaded.libx"));

    for classes in [100, 1_000, 5_000] {
        let inputs = AssemblyInputs::new()
            .with_module("core", owned())
            .with_dependency(lib.clone(), library(classes));
        group.throughput(Throughput::Elements(classes as u64));
        group.bench_with_input(BenchmarkId::from_parameter(classes), &inputs, |b, inputs| {
            b.iter(|| merge(&target, &spec, black_box(inputs)))
        });
    }
    group.finish();
}

fn bench_jar_bytes(c: &mut Criterion) {
    let lib = DependencyCoordinate::new("com.libx", "libx", "1.0");
    let target = MergeTarget::new("dist", Version::new(1, 0, 0));
    let spec = MergeSpec::new().include_dependency(lib.clone());
    let inputs = AssemblyInputs::new().with_dependency(lib, library(1_000));

    if let Ok(artifact) = merge(&target, &spec, &inputs) {
        c.bench_function("jar_bytes_1k_entries", |b| b.iter(|| artifact.to_jar_bytes()));
    }
}

criterion_group!(benches, bench_relocate_class, bench_merge, bench_jar_bytes);
criterion_main!(benches);
