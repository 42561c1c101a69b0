//! Relocation and merge engine tests

mod common;

use common::{class_file, coordinate, lib_x, module_a, module_b};
use forge_build::publication::{self, variants};
use forge_build::shadow::classfile::utf8_constants;
use forge_build::shadow::{
    assemble, merge, Archive, AssemblyCache, AssemblyInputs, MergeTarget, Origin,
};
use forge_build::{
    BuildError, CoordinatePattern, MergeSpec, Module, ProfileApplier, ProfileOptions,
    RelocationRule, RootScope,
};
use pretty_assertions::assert_eq;
use semver::Version;
use tempfile::TempDir;

fn target() -> MergeTarget {
    MergeTarget::new("worldguard-bukkit", Version::parse("7.0.9").unwrap())
        .with_implementation_version("7.0.9+abc1234")
}

fn scenario_spec() -> MergeSpec {
    let lib = coordinate("com.libx:libx:1.0");
    MergeSpec::conventional()
        .include_module("module-a")
        .include_module("module-b")
        .include_dependency(lib.clone())
        .relocate(
            RelocationRule::new("com.libx", "com.example.shaded.libx")
                .with_applies_to([lib]),
        )
}

fn scenario_inputs() -> AssemblyInputs {
    AssemblyInputs::new()
        .with_module("module-a", module_a())
        .with_module("module-b", module_b())
        .with_dependency(coordinate("com.libx:libx:1.0"), lib_x())
        .with_dependency(
            coordinate("com.other:other:2.0"),
            Archive::new().with_entry("com/other/Other.class", class_file(&["com/other/Other"])),
        )
}

#[test]
fn test_relocation_scenario() {
    let artifact = merge(&target(), &scenario_spec(), &scenario_inputs()).unwrap();

    assert_eq!(artifact.file_name, "worldguard-bukkit-7.0.9-dist.jar");
    assert_eq!(
        artifact.paths().collect::<Vec<_>>(),
        vec![
            "META-INF/services/com.example.shaded.libx.spi.Provider",
            "com/example/a/Main.class",
            "com/example/b/Helper.class",
            "com/example/shaded/libx/Foo.class",
            "com/example/shaded/libx/internal/Bar.class",
            "com/example/shaded/libx/libx.properties",
            "plugin.yml",
        ]
    );

    let foo = artifact.get("com/example/shaded/libx/Foo.class").unwrap();
    assert_eq!(foo.origin, Origin::Dependency(coordinate("com.libx:libx:1.0")));
    assert_eq!(
        utf8_constants("Foo.class", &foo.bytes).unwrap(),
        vec![
            "com/example/shaded/libx/Foo",
            "com/example/shaded/libx/internal/Bar",
            "Lcom/example/shaded/libx/Foo;",
            "com.example.shaded.libx.Foo",
        ]
    );

    let service = artifact
        .get("META-INF/services/com.example.shaded.libx.spi.Provider")
        .unwrap();
    assert_eq!(service.bytes, b"com.example.shaded.libx.internal.ProviderImpl\n");

    // owned code is never rewritten
    let main = artifact.get("com/example/a/Main.class").unwrap();
    assert_eq!(main.bytes, module_a().get("com/example/a/Main.class").unwrap());
}

#[test]
fn test_no_original_prefix_left_in_relocated_entries() {
    let artifact = merge(&target(), &scenario_spec(), &scenario_inputs()).unwrap();
    let origin = Origin::Dependency(coordinate("com.libx:libx:1.0"));

    for path in artifact.paths_from(&origin) {
        assert!(!path.starts_with("com/libx/"), "{} was not relocated", path);
        let bytes = &artifact.get(path).unwrap().bytes;
        let text = String::from_utf8_lossy(bytes);
        assert!(!text.contains("com/libx/"), "{} still references com/libx/", path);
        assert!(!text.contains("com.libx."), "{} still references com.libx.", path);
    }
}

#[test]
fn test_only_included_dependencies_contribute() {
    let artifact = merge(&target(), &scenario_spec(), &scenario_inputs()).unwrap();
    let other = Origin::Dependency(coordinate("com.other:other:2.0"));
    assert_eq!(artifact.paths_from(&other).count(), 0);
    assert!(!artifact.contains("com/other/Other.class"));
}

#[test]
fn test_excludes_and_signatures_dropped() {
    let artifact = merge(&target(), &scenario_spec(), &scenario_inputs()).unwrap();
    assert!(!artifact.contains("LICENSE.txt"));
    assert!(!artifact.contains("META-INF/LIBX.SF"));

    let manifest = artifact.manifest();
    assert!(manifest.starts_with("Manifest-Version: 1.0\r\n"));
    assert!(manifest.contains("Implementation-Version: 7.0.9+abc1234\r\n"));
}

#[test]
fn test_exclusion_matches_relocated_path() {
    let spec = scenario_spec().exclude("com/example/shaded/libx/internal/**");
    let artifact = merge(&target(), &spec, &scenario_inputs()).unwrap();
    assert!(artifact.contains("com/example/shaded/libx/Foo.class"));
    assert!(!artifact.contains("com/example/shaded/libx/internal/Bar.class"));
}

#[test]
fn test_exclude_dependency_overrides_include() {
    let spec = scenario_spec().exclude_dependency("com.libx:libx".parse::<CoordinatePattern>().unwrap());
    // no input for libx is needed once it is excluded
    let inputs = AssemblyInputs::new()
        .with_module("module-a", module_a())
        .with_module("module-b", module_b());
    let artifact = merge(&target(), &spec, &inputs).unwrap();
    assert!(!artifact.paths().any(|p| p.contains("libx")));
}

#[test]
fn test_owned_collision_is_an_error() {
    let spec = MergeSpec::new().include_module("module-a").include_module("module-b");
    let inputs = AssemblyInputs::new()
        .with_module("module-a", Archive::new().with_entry("plugin.yml", b"a".to_vec()))
        .with_module("module-b", Archive::new().with_entry("plugin.yml", b"b".to_vec()));

    let err = merge(&target(), &spec, &inputs).unwrap_err();
    match err {
        BuildError::Assembly { path, first, second, .. } => {
            assert_eq!(path, "plugin.yml");
            assert_eq!(first, "module module-a");
            assert_eq!(second, "module module-b");
        }
        other => panic!("expected an assembly error, got {:?}", other),
    }
}

#[test]
fn test_own_output_is_merged_first() {
    let own = Archive::new().with_entry(
        "com/example/bukkit/Plugin.class",
        class_file(&["com/example/bukkit/Plugin"]),
    );
    let inputs = scenario_inputs().with_own_output(own);

    let artifact = merge(&target(), &scenario_spec(), &inputs).unwrap();
    let own_origin = Origin::Module("worldguard-bukkit".to_string());
    assert_eq!(
        artifact.paths_from(&own_origin).collect::<Vec<_>>(),
        vec!["com/example/bukkit/Plugin.class"]
    );
    assert!(artifact.contains("com/example/a/Main.class"));
}

#[test]
fn test_own_output_clash_with_included_module_is_an_error() {
    let spec = MergeSpec::new().include_module("module-a");
    let inputs = AssemblyInputs::new()
        .with_own_output(Archive::new().with_entry("plugin.yml", b"own".to_vec()))
        .with_module("module-a", Archive::new().with_entry("plugin.yml", b"a".to_vec()));

    let err = merge(&target(), &spec, &inputs).unwrap_err();
    match err {
        BuildError::Assembly { path, first, second, .. } => {
            assert_eq!(path, "plugin.yml");
            assert_eq!(first, "module worldguard-bukkit");
            assert_eq!(second, "module module-a");
        }
        other => panic!("expected an assembly error, got {:?}", other),
    }
}

#[test]
fn test_own_output_beats_dependency() {
    let lib = coordinate("org.bstats:bstats:1.0");
    let spec = MergeSpec::new().include_dependency(lib.clone());
    let inputs = AssemblyInputs::new()
        .with_own_output(Archive::new().with_entry("config.yml", b"own".to_vec()))
        .with_dependency(lib, Archive::new().with_entry("config.yml", b"third-party".to_vec()));

    let artifact = merge(&target(), &spec, &inputs).unwrap();
    let entry = artifact.get("config.yml").unwrap();
    assert_eq!(entry.bytes, b"own");
    assert_eq!(entry.origin, Origin::Module("worldguard-bukkit".to_string()));
    assert!(artifact.collisions.is_empty());
}

#[test]
fn test_owned_content_beats_dependency() {
    let spec = MergeSpec::new()
        .include_dependency(coordinate("org.bstats:bstats:1.0"))
        .include_module("module-a");
    let inputs = AssemblyInputs::new()
        .with_module("module-a", Archive::new().with_entry("config.yml", b"owned".to_vec()))
        .with_dependency(
            coordinate("org.bstats:bstats:1.0"),
            Archive::new().with_entry("config.yml", b"third-party".to_vec()),
        );

    let artifact = merge(&target(), &spec, &inputs).unwrap();
    let entry = artifact.get("config.yml").unwrap();
    assert_eq!(entry.bytes, b"owned");
    assert_eq!(entry.origin, Origin::Module("module-a".to_string()));
    assert!(artifact.collisions.is_empty());
}

#[test]
fn test_dependency_collision_keeps_first() {
    let first = coordinate("org.first:first:1.0");
    let second = coordinate("org.second:second:1.0");
    let spec = MergeSpec::new()
        .include_dependency(first.clone())
        .include_dependency(second.clone());
    let inputs = AssemblyInputs::new()
        .with_dependency(first.clone(), Archive::new().with_entry("shared.txt", b"first".to_vec()))
        .with_dependency(second.clone(), Archive::new().with_entry("shared.txt", b"second".to_vec()));

    let artifact = merge(&target(), &spec, &inputs).unwrap();
    assert_eq!(artifact.get("shared.txt").unwrap().bytes, b"first");
    assert_eq!(artifact.collisions.len(), 1);
    assert_eq!(artifact.collisions[0].kept, Origin::Dependency(first));
    assert_eq!(artifact.collisions[0].discarded, Origin::Dependency(second));
}

#[test]
fn test_missing_input_is_a_configuration_error() {
    let spec = MergeSpec::new().include_module("module-a");
    let err = merge(&target(), &spec, &AssemblyInputs::new()).unwrap_err();
    assert!(matches!(err, BuildError::Configuration { .. }));
}

#[test]
fn test_output_is_reproducible() {
    let first = merge(&target(), &scenario_spec(), &scenario_inputs()).unwrap();
    let second = merge(&target(), &scenario_spec(), &scenario_inputs()).unwrap();
    assert_eq!(first.to_jar_bytes().unwrap(), second.to_jar_bytes().unwrap());

    let temp = TempDir::new().unwrap();
    let path = first.write_to(temp.path()).unwrap();
    let reread = Archive::read_jar(&path).unwrap();
    assert_eq!(reread, first.to_archive());
}

#[test]
fn test_cache_hit_skips_merge() {
    let temp = TempDir::new().unwrap();
    let cache = AssemblyCache::new(temp.path());

    let miss = cache
        .get_or_assemble(&target(), &scenario_spec(), &scenario_inputs())
        .unwrap();
    let hit = cache
        .get_or_assemble(&target(), &scenario_spec(), &scenario_inputs())
        .unwrap();
    assert!(!miss.hit);
    assert!(hit.hit);
    assert_eq!(miss.fingerprint, hit.fingerprint);
}

#[test]
fn test_assemble_without_shadow_profile_violates_policy() {
    let scope = RootScope::new("/ws", "com.example", Version::parse("1.0.0").unwrap())
        .with_build_id("abc1234")
        .unwrap();
    let mut module = Module::new("module-a", "com.example", Version::parse("1.0.0").unwrap());
    ProfileApplier::new(&scope)
        .apply(&mut module, "platform-and-core", &ProfileOptions::default())
        .unwrap();

    let spec = MergeSpec::new().include_module("module-b");
    let inputs = AssemblyInputs::new().with_module("module-b", module_b());
    let artifact = assemble(&mut module, &spec, &inputs).unwrap();
    assert_eq!(artifact.file_name, "module-a-1.0.0-dist.jar");

    assert!(matches!(
        publication::verify_policy(&module),
        Err(BuildError::PolicyViolation { .. })
    ));
    publication::suppress_variant(&mut module, variants::SHADOW_RUNTIME_ELEMENTS).unwrap();
    assert!(publication::verify_policy(&module).is_ok());
}
