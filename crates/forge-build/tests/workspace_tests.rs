//! Workspace configuration and task execution tests

mod common;

use common::{coordinate, lib_x, module_a, module_b};
use forge_build::module::{JavadocSettings, TestSettings};
use forge_build::shadow::{Archive, Origin};
use forge_build::tasks::names;
use forge_build::{
    AssemblyCache, BuildError, BuildResult, Collaborators, DependencyCoordinate, DependencyResolver,
    DocGenerator, MergeSpec, Module, ProfileOptions, RelocationRule, RootScope, SourceSet,
    StyleCheckReport, StyleChecker, TaskExecutor, TestOutcome, Toolchain, Workspace,
};
use forge_config::ConfigLoader;
use pretty_assertions::assert_eq;
use semver::Version;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

struct FakeToolchain {
    outputs: BTreeMap<String, Archive>,
    failing_tests: usize,
}

impl Toolchain for FakeToolchain {
    fn compile(&self, module: &Module, _release: u32) -> BuildResult<Archive> {
        self.outputs
            .get(&module.name)
            .cloned()
            .ok_or_else(|| BuildError::configuration(&module.name, "no output"))
    }

    fn sources(&self, module: &Module) -> BuildResult<Archive> {
        Ok(Archive::new().with_entry(format!("{}/Main.java", module.name), b"class Main {}".to_vec()))
    }

    fn run_tests(&self, _module: &Module, _settings: &TestSettings) -> BuildResult<TestOutcome> {
        Ok(TestOutcome {
            passed: 3,
            failed: self.failing_tests,
            skipped: 0,
        })
    }
}

struct FakeStyleChecker {
    fail_on: Option<SourceSet>,
}

impl StyleChecker for FakeStyleChecker {
    fn run_style_check(
        &self,
        _module: &Module,
        source_set: SourceSet,
        _rule_file: &Path,
        tool_version: &str,
    ) -> BuildResult<StyleCheckReport> {
        assert_eq!(tool_version, "10.3");
        let passed = self.fail_on != Some(source_set);
        Ok(StyleCheckReport {
            passed,
            report: if passed { String::new() } else { "Main.java:1: tab character".to_string() },
        })
    }
}

struct FakeDocs;

impl DocGenerator for FakeDocs {
    fn generate_docs(&self, _module: &Module, settings: &JavadocSettings) -> BuildResult<Archive> {
        Ok(Archive::new().with_entry("index.html", settings.options.join(" ").into_bytes()))
    }
}

struct FakeResolver {
    artifacts: BTreeMap<DependencyCoordinate, Archive>,
}

impl DependencyResolver for FakeResolver {
    fn resolve(&self, coordinate: &DependencyCoordinate) -> BuildResult<Archive> {
        self.artifacts
            .get(coordinate)
            .cloned()
            .ok_or_else(|| BuildError::resolution(coordinate, "unknown"))
    }
}

fn scope(root: &Path) -> RootScope {
    RootScope::new(root, "com.example", Version::parse("1.0.0").unwrap())
        .with_build_id("abc1234")
        .unwrap()
}

fn module(name: &str) -> Module {
    Module::new(name, "com.example", Version::parse("1.0.0").unwrap())
}

fn shadow_workspace(root: &Path) -> Workspace {
    let lib = coordinate("com.libx:libx:1.0");
    let spec = MergeSpec::conventional()
        .include_module("module-a")
        .include_module("module-b")
        .include_dependency(lib.clone())
        .relocate(RelocationRule::new("com.libx", "com.example.shaded.libx").with_applies_to([lib]));

    let mut workspace = Workspace::new(scope(root), ProfileOptions::default())
        .with_target_dir(root.join("build"));
    let platform = vec!["platform-and-core".to_string()];
    workspace.add_module(module("module-a"), platform.clone()).unwrap();
    workspace.add_module(module("module-b"), platform).unwrap();

    let mut dist = module("dist").with_shadow(spec);
    dist.project_dependencies.insert("module-a".to_string());
    dist.project_dependencies.insert("module-b".to_string());
    workspace
        .add_module(
            dist,
            vec!["platform-and-core".to_string(), "shadow-enabled".to_string()],
        )
        .unwrap();
    workspace
}

fn toolchain(failing_tests: usize) -> FakeToolchain {
    let mut outputs = BTreeMap::new();
    outputs.insert("module-a".to_string(), module_a());
    outputs.insert("module-b".to_string(), module_b());
    outputs.insert(
        "dist".to_string(),
        Archive::new().with_entry("com/example/dist/Launcher.class", b"launcher".to_vec()),
    );
    FakeToolchain {
        outputs,
        failing_tests,
    }
}

fn resolver() -> FakeResolver {
    let mut artifacts = BTreeMap::new();
    artifacts.insert(coordinate("com.libx:libx:1.0"), lib_x());
    FakeResolver { artifacts }
}

#[test]
fn test_failing_module_does_not_affect_siblings() {
    let temp = TempDir::new().unwrap();
    let mut workspace = Workspace::new(scope(temp.path()), ProfileOptions::default());
    workspace
        .add_module(module("core"), vec!["platform-and-core".to_string()])
        .unwrap();
    workspace
        .add_module(module("broken"), vec!["platform-and-core".to_string(), "nope".to_string()])
        .unwrap();
    workspace
        .add_module(module("bukkit"), vec!["shadow-enabled".to_string()])
        .unwrap();

    let report = workspace.configure();

    assert_eq!(report.configured, vec!["core"]);
    assert!(matches!(report.failure("broken"), Some(BuildError::Configuration { .. })));
    assert!(matches!(report.failure("bukkit"), Some(BuildError::Configuration { .. })));

    assert!(workspace.module("core").unwrap().has_profile("platform-and-core"));
    let broken = workspace.module("broken").unwrap();
    assert!(broken.applied_profiles.is_empty());
    assert!(broken.tasks.is_empty());
}

#[test]
fn test_module_order_follows_project_dependencies() {
    let temp = TempDir::new().unwrap();
    let workspace = shadow_workspace(temp.path());
    assert_eq!(workspace.module_order().unwrap(), vec!["module-a", "module-b", "dist"]);
}

#[test]
fn test_shadow_jar_task() {
    let temp = TempDir::new().unwrap();
    let mut workspace = shadow_workspace(temp.path());
    assert!(workspace.configure().is_success());

    let toolchain = toolchain(0);
    let style = FakeStyleChecker { fail_on: None };
    let resolver = resolver();
    let executor = TaskExecutor::new(Collaborators {
        toolchain: &toolchain,
        style_checker: &style,
        doc_generator: &FakeDocs,
        resolver: &resolver,
        repository: None,
    });

    let report = executor.run(&workspace, "dist", names::SHADOW_JAR).unwrap();
    assert_eq!(report.executed, vec![names::COMPILE_JAVA, names::JAR, names::SHADOW_JAR]);

    let merged = temp.path().join("build/libs/dist-1.0.0-dist.jar");
    assert_eq!(report.outputs.last(), Some(&merged));
    let archive = Archive::read_jar(&merged).unwrap();
    assert!(archive.contains("com/example/a/Main.class"));
    assert!(archive.contains("com/example/shaded/libx/Foo.class"));
    assert!(!archive.contains("com/libx/Foo.class"));
    assert!(archive.contains("com/example/dist/Launcher.class"));
    assert_eq!(
        archive.get("com/example/dist/Launcher.class"),
        Some(&b"launcher"[..])
    );

    let primary = Archive::read_jar(&temp.path().join("build/libs/dist-1.0.0.jar")).unwrap();
    assert!(primary.contains("com/example/dist/Launcher.class"));
}

#[test]
fn test_shadow_jar_uses_cache() {
    let temp = TempDir::new().unwrap();
    let mut workspace = shadow_workspace(temp.path());
    workspace.configure();

    let toolchain = toolchain(0);
    let style = FakeStyleChecker { fail_on: None };
    let resolver = resolver();
    let executor = TaskExecutor::new(Collaborators {
        toolchain: &toolchain,
        style_checker: &style,
        doc_generator: &FakeDocs,
        resolver: &resolver,
        repository: None,
    })
    .with_cache(AssemblyCache::new(temp.path().join("cache")));

    let first = executor.run(&workspace, "dist", names::SHADOW_JAR).unwrap();
    let second = executor.run(&workspace, "dist", names::SHADOW_JAR).unwrap();
    assert_eq!(first.cache_hit, Some(false));
    assert_eq!(second.cache_hit, Some(true));
    assert!(temp.path().join("build/libs/dist-1.0.0-dist.jar").is_file());
}

#[test]
fn test_cached_shadow_jar_reports_collisions() {
    let temp = TempDir::new().unwrap();
    let first = coordinate("org.one:one:1.0");
    let second = coordinate("org.two:two:1.0");
    let spec = MergeSpec::new()
        .include_dependency(first.clone())
        .include_dependency(second.clone());

    let mut workspace = Workspace::new(scope(temp.path()), ProfileOptions::default())
        .with_target_dir(temp.path().join("build"));
    workspace
        .add_module(
            module("dist").with_shadow(spec),
            vec!["platform-and-core".to_string(), "shadow-enabled".to_string()],
        )
        .unwrap();
    assert!(workspace.configure().is_success());

    let toolchain = toolchain(0);
    let style = FakeStyleChecker { fail_on: None };
    let mut artifacts = BTreeMap::new();
    artifacts.insert(first.clone(), Archive::new().with_entry("config.yml", b"one".to_vec()));
    artifacts.insert(second.clone(), Archive::new().with_entry("config.yml", b"two".to_vec()));
    let resolver = FakeResolver { artifacts };
    let executor = TaskExecutor::new(Collaborators {
        toolchain: &toolchain,
        style_checker: &style,
        doc_generator: &FakeDocs,
        resolver: &resolver,
        repository: None,
    })
    .with_cache(AssemblyCache::new(temp.path().join("cache")));

    let miss = executor.run(&workspace, "dist", names::SHADOW_JAR).unwrap();
    let hit = executor.run(&workspace, "dist", names::SHADOW_JAR).unwrap();
    assert_eq!(miss.cache_hit, Some(false));
    assert_eq!(hit.cache_hit, Some(true));

    for report in [&miss, &hit] {
        assert_eq!(report.collisions.len(), 1);
        let collision = &report.collisions[0];
        assert_eq!(collision.path, "config.yml");
        assert_eq!(collision.kept, Origin::Dependency(first.clone()));
        assert_eq!(collision.discarded, Origin::Dependency(second.clone()));
    }
}

#[test]
fn test_check_gate() {
    let temp = TempDir::new().unwrap();
    let mut workspace = shadow_workspace(temp.path());
    workspace.configure();

    let toolchain = toolchain(0);
    let passing = FakeStyleChecker { fail_on: None };
    let resolver = resolver();
    let executor = TaskExecutor::new(Collaborators {
        toolchain: &toolchain,
        style_checker: &passing,
        doc_generator: &FakeDocs,
        resolver: &resolver,
        repository: None,
    });
    let report = executor.run(&workspace, "module-a", names::CHECK).unwrap();
    assert!(report.executed.contains(&names::VERIFY_PUBLICATION_POLICY.to_string()));
    assert_eq!(report.executed.last().map(String::as_str), Some(names::CHECK));

    let failing = FakeStyleChecker {
        fail_on: Some(SourceSet::Test),
    };
    let executor = TaskExecutor::new(Collaborators {
        toolchain: &toolchain,
        style_checker: &failing,
        doc_generator: &FakeDocs,
        resolver: &resolver,
        repository: None,
    });
    let err = executor.run(&workspace, "module-a", names::CHECK).unwrap_err();
    assert!(matches!(err, BuildError::StyleCheckFailed { ref source_set, .. } if source_set == "test"));
}

#[test]
fn test_failing_tests_fail_check() {
    let temp = TempDir::new().unwrap();
    let mut workspace = shadow_workspace(temp.path());
    workspace.configure();

    let toolchain = toolchain(2);
    let style = FakeStyleChecker { fail_on: None };
    let resolver = resolver();
    let executor = TaskExecutor::new(Collaborators {
        toolchain: &toolchain,
        style_checker: &style,
        doc_generator: &FakeDocs,
        resolver: &resolver,
        repository: None,
    });
    let err = executor.run(&workspace, "module-b", names::CHECK).unwrap_err();
    assert!(matches!(err, BuildError::TestsFailed { failed: 2, total: 5, .. }));
}

#[test]
fn test_from_config() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("forge.toml"),
        r#"
[project]
group = "com.sk89q.worldguard"
version = "7.0.9-SNAPSHOT"
build-id = "abc1234"

[publish-sources]
worldguard-core = true

[[module]]
name = "worldguard-core"
profiles = ["platform-and-core"]

[[module]]
name = "worldguard-bukkit"
profiles = ["platform-and-core", "shadow-enabled"]
project-dependencies = ["worldguard-core"]

[module.shadow]
include-modules = ["worldguard-core"]
"#,
    )
    .unwrap();

    let config = ConfigLoader::new()
        .without_git()
        .load_from_directory(temp.path())
        .unwrap();
    let mut workspace = Workspace::from_config(&config).unwrap();
    let report = workspace.configure();
    assert!(report.is_success(), "{:?}", report.failures);

    let bukkit = workspace.module("worldguard-bukkit").unwrap();
    assert_eq!(
        bukkit.merge_spec.as_ref().map(|s| s.include_modules.clone()),
        Some(vec!["worldguard-core".to_string()])
    );
    assert_eq!(
        bukkit.internal_version.as_ref().map(ToString::to_string).as_deref(),
        Some("7.0.9-SNAPSHOT+abc1234")
    );
    assert_eq!(workspace.libs_dir(), temp.path().join("build/libs"));
}
