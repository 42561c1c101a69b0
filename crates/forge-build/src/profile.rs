//! Build profiles
//!
//! A profile is a fixed, ordered list of configuration steps. The applier
//! runs them against a module using values from the root scope. Steps are
//! idempotent: applying a profile twice leaves the module unchanged.

use crate::error::{BuildError, BuildResult};
use crate::module::{ArtifactKind, CompileSettings, JavadocSettings, Module, TestRunner, TestSettings};
use crate::publication::{self, variants, RepositoryTarget, Variant};
use crate::shadow::MergeSpec;
use crate::tasks::names;
use crate::version::{InternalVersion, RootScope};
use forge_config::Config;
use forge_package::{CoordinatePattern, DependencyCoordinate, DependencyScope};

/// Source encoding passed to the compiler and doc generator
pub const SOURCE_ENCODING: &str = "UTF-8";

/// Options passed to the doc generator
pub const JAVADOC_OPTIONS: [&str; 2] = ["-Xdoclint:none", "-quiet"];

/// Custom doc tags (`name:placement:header`)
pub const JAVADOC_TAGS: [&str; 3] = [
    "apiNote:a:API Note:",
    "implSpec:a:Implementation Requirements:",
    "implNote:a:Implementation Note:",
];

/// Logging facade banned when `ban_slf4j` is set
pub const SLF4J_API: &str = "org.slf4j:slf4j-api";

/// Build profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Profile {
    /// Compile, quality checks, docs, tests, conventional dependencies and
    /// publishing
    PlatformAndCore,
    /// Merged distributable assembly
    ShadowEnabled,
}

impl Profile {
    /// Parse profile from its name
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "platform-and-core" => Some(Self::PlatformAndCore),
            "shadow-enabled" => Some(Self::ShadowEnabled),
            _ => None,
        }
    }

    /// Get profile name
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlatformAndCore => "platform-and-core",
            Self::ShadowEnabled => "shadow-enabled",
        }
    }

    /// Steps in application order
    pub fn steps(&self) -> &'static [Step] {
        match self {
            Self::PlatformAndCore => &[
                Step::CompileSettings,
                Step::StyleCheck,
                Step::Documentation,
                Step::TestExecution,
                Step::DependencyDeclarations,
                Step::PublicationRegistration,
            ],
            Self::ShadowEnabled => &[Step::ShadowWiring],
        }
    }

    /// Every known profile
    pub fn all() -> [Profile; 2] {
        [Self::PlatformAndCore, Self::ShadowEnabled]
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single configuration step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    CompileSettings,
    StyleCheck,
    Documentation,
    TestExecution,
    DependencyDeclarations,
    PublicationRegistration,
    ShadowWiring,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CompileSettings => "compile-settings",
            Self::StyleCheck => "style-check",
            Self::Documentation => "documentation",
            Self::TestExecution => "test-execution",
            Self::DependencyDeclarations => "dependency-declarations",
            Self::PublicationRegistration => "publication-registration",
            Self::ShadowWiring => "shadow-wiring",
        }
    }
}

/// Toggles shared by every module in a build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileOptions {
    /// Target language level
    pub java_release: u32,
    /// Produce a sources artifact
    pub sources_jar: bool,
    /// Forbid the slf4j facade
    pub ban_slf4j: bool,
}

impl Default for ProfileOptions {
    fn default() -> Self {
        Self {
            java_release: forge_config::project::DEFAULT_JAVA_RELEASE,
            sources_jar: true,
            ban_slf4j: false,
        }
    }
}

impl ProfileOptions {
    /// Options from loaded configuration (file and environment)
    pub fn from_config(config: &Config) -> Self {
        Self {
            java_release: config.java_release(),
            sources_jar: config.sources_jar(),
            ban_slf4j: config.ban_slf4j(),
        }
    }
}

/// Applies profiles to modules
pub struct ProfileApplier<'a> {
    scope: &'a RootScope,
}

impl<'a> ProfileApplier<'a> {
    pub fn new(scope: &'a RootScope) -> Self {
        Self { scope }
    }

    /// Apply a named profile to a module
    ///
    /// Steps run on a copy of the module which replaces the original only if
    /// every step succeeds.
    pub fn apply(&self, module: &mut Module, profile_name: &str, options: &ProfileOptions) -> BuildResult<()> {
        let profile = Profile::from_str(profile_name).ok_or_else(|| {
            BuildError::configuration(&module.name, format!("unknown profile '{}'", profile_name))
        })?;
        forge_config::project::validate_java_release(options.java_release)
            .map_err(|e| BuildError::configuration(&module.name, e))?;
        let internal = self.scope.require_internal_version(&module.name)?;

        let mut staged = module.clone();
        for step in profile.steps() {
            self.apply_step(*step, &mut staged, internal, options)?;
            tracing::debug!(module = %staged.name, step = step.name(), "applied step");
        }
        if !staged.has_profile(profile.name()) {
            staged.applied_profiles.push(profile.name().to_string());
        }

        *module = staged;
        tracing::info!(module = %module.name, profile = %profile, "applied profile");
        Ok(())
    }

    /// Apply several profiles in order
    pub fn apply_all<S: AsRef<str>>(&self, module: &mut Module, profiles: &[S], options: &ProfileOptions) -> BuildResult<()> {
        for profile in profiles {
            self.apply(module, profile.as_ref(), options)?;
        }
        Ok(())
    }

    fn apply_step(
        &self,
        step: Step,
        module: &mut Module,
        internal: &InternalVersion,
        options: &ProfileOptions,
    ) -> BuildResult<()> {
        match step {
            Step::CompileSettings => compile_settings(module, internal, options),
            Step::StyleCheck => self.style_check(module),
            Step::Documentation => self.documentation(module, options),
            Step::TestExecution => test_execution(module),
            Step::DependencyDeclarations => self.dependency_declarations(module, options),
            Step::PublicationRegistration => self.publication_registration(module),
            Step::ShadowWiring => shadow_wiring(module),
        }
    }

    fn style_check(&self, module: &mut Module) -> BuildResult<()> {
        module.checkstyle = Some(self.scope.checkstyle().clone());

        let tasks = &mut module.tasks;
        tasks.register(names::CHECKSTYLE_MAIN, "Run checkstyle on main sources");
        tasks.register(names::CHECKSTYLE_TEST, "Run checkstyle on test sources");
        tasks.register(names::CHECK, "Run all verification tasks");
        tasks.depends_on(names::CHECKSTYLE_MAIN, names::COMPILE_JAVA)?;
        tasks.depends_on(names::CHECKSTYLE_TEST, names::COMPILE_TEST_JAVA)?;
        tasks.depends_on(names::CHECK, names::CHECKSTYLE_MAIN)?;
        tasks.depends_on(names::CHECK, names::CHECKSTYLE_TEST)?;
        Ok(())
    }

    fn documentation(&self, module: &mut Module, options: &ProfileOptions) -> BuildResult<()> {
        module.javadoc = Some(JavadocSettings {
            options: JAVADOC_OPTIONS.iter().map(|s| s.to_string()).collect(),
            tags: JAVADOC_TAGS.iter().map(|s| s.to_string()).collect(),
        });

        module.tasks.register(names::JAVADOC, "Generate API documentation");
        module.tasks.register(names::JAVADOC_JAR, "Package API documentation");
        module.tasks.depends_on(names::JAVADOC, names::COMPILE_JAVA)?;
        module.tasks.depends_on(names::JAVADOC_JAR, names::JAVADOC)?;
        module.add_artifact(ArtifactKind::Javadoc, Some("javadoc"), names::JAVADOC_JAR);
        publication::ensure_component(module).add_variant(Variant::javadoc_elements());

        if !options.sources_jar {
            return Ok(());
        }
        module.tasks.register(names::SOURCES_JAR, "Package main sources");
        module.add_artifact(ArtifactKind::Sources, Some("sources"), names::SOURCES_JAR);

        if self.scope.publishes_sources(&module.name) {
            publication::ensure_component(module).add_variant(Variant::sources_elements());
        }
        Ok(())
    }

    fn dependency_declarations(&self, module: &mut Module, options: &ProfileOptions) -> BuildResult<()> {
        let versions = self.scope.versions();
        let jsr305 = DependencyCoordinate::new("com.google.code.findbugs", "jsr305", &versions.jsr305);
        let declarations = [
            (DependencyScope::CompileOnly, jsr305.clone()),
            (DependencyScope::TestCompileOnly, jsr305),
            (
                DependencyScope::TestImplementation,
                DependencyCoordinate::new("org.junit.jupiter", "junit-jupiter-api", &versions.junit),
            ),
            (
                DependencyScope::TestImplementation,
                DependencyCoordinate::new("org.junit.jupiter", "junit-jupiter-params", &versions.junit),
            ),
            (
                DependencyScope::TestImplementation,
                DependencyCoordinate::new("org.mockito", "mockito-core", &versions.mockito),
            ),
            (
                DependencyScope::TestImplementation,
                DependencyCoordinate::new("org.mockito", "mockito-junit-jupiter", &versions.mockito),
            ),
            (
                DependencyScope::TestRuntimeOnly,
                DependencyCoordinate::new("org.junit.jupiter", "junit-jupiter-engine", &versions.junit),
            ),
        ];
        for (scope, coordinate) in declarations {
            module.add_dependency(scope, coordinate);
        }

        if options.ban_slf4j {
            let pattern: CoordinatePattern = SLF4J_API.parse()?;
            module.ban(pattern);
        }
        if !module.banned.is_empty() {
            module
                .tasks
                .register(names::VERIFY_BANNED_DEPENDENCIES, "Fail on banned dependencies");
            module
                .tasks
                .depends_on(names::CHECK, names::VERIFY_BANNED_DEPENDENCIES)?;
        }
        Ok(())
    }

    fn publication_registration(&self, module: &mut Module) -> BuildResult<()> {
        publication::register_publication(module)?;
        if let Some(settings) = self.scope.repository() {
            module.repository = Some(RepositoryTarget::for_version(settings, &module.version));
        }

        let tasks = &mut module.tasks;
        tasks.register(
            names::VERIFY_PUBLICATION_POLICY,
            "Check that merged artifacts are not published",
        );
        tasks.register(names::PUBLISH, "Publish the canonical artifacts");
        tasks.depends_on(names::CHECK, names::VERIFY_PUBLICATION_POLICY)?;
        tasks.depends_on(names::PUBLISH, names::VERIFY_PUBLICATION_POLICY)?;
        tasks.depends_on(names::PUBLISH, names::JAR)?;
        tasks.depends_on(names::PUBLISH, names::JAVADOC_JAR)?;
        if tasks.contains(names::SOURCES_JAR) {
            tasks.depends_on(names::PUBLISH, names::SOURCES_JAR)?;
        }
        Ok(())
    }
}

fn compile_settings(module: &mut Module, internal: &InternalVersion, options: &ProfileOptions) -> BuildResult<()> {
    module.internal_version = Some(internal.clone());
    module.compile = Some(CompileSettings {
        release: options.java_release,
        encoding: SOURCE_ENCODING.to_string(),
    });

    let tasks = &mut module.tasks;
    tasks.register(names::COMPILE_JAVA, "Compile main sources");
    tasks.register(names::COMPILE_TEST_JAVA, "Compile test sources");
    tasks.register(names::JAR, "Package the primary jar");
    tasks.depends_on(names::COMPILE_TEST_JAVA, names::COMPILE_JAVA)?;
    tasks.depends_on(names::JAR, names::COMPILE_JAVA)?;

    module.add_artifact(ArtifactKind::Primary, None, names::JAR);
    let component = publication::ensure_component(module);
    component.add_variant(Variant::api_elements());
    component.add_variant(Variant::runtime_elements());
    Ok(())
}

fn test_execution(module: &mut Module) -> BuildResult<()> {
    module.test = Some(TestSettings {
        runner: TestRunner::JUnitPlatform,
    });
    module.tasks.register(names::TEST, "Run tests on the JUnit Platform");
    module.tasks.depends_on(names::TEST, names::COMPILE_TEST_JAVA)?;
    module.tasks.depends_on(names::CHECK, names::TEST)?;
    Ok(())
}

fn shadow_wiring(module: &mut Module) -> BuildResult<()> {
    if module.component.is_none() || !module.tasks.contains(names::JAR) {
        return Err(BuildError::configuration(
            &module.name,
            "shadow-enabled requires the platform-and-core profile to be applied first",
        ));
    }

    let spec = module
        .declared_shadow
        .clone()
        .unwrap_or_else(MergeSpec::conventional);
    spec.validate(&module.name)?;

    module.tasks.register(names::SHADOW_JAR, "Assemble the merged distributable");
    module.tasks.depends_on(names::SHADOW_JAR, names::JAR)?;
    module.add_artifact(ArtifactKind::Merged, Some(&spec.classifier), names::SHADOW_JAR);
    module.merge_spec = Some(spec);

    publication::add_merged_variant(module);
    publication::suppress_variant(module, variants::SHADOW_RUNTIME_ELEMENTS)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use semver::Version;

    fn scope() -> RootScope {
        RootScope::new("/ws", "com.sk89q.worldguard", Version::parse("7.0.9-SNAPSHOT").unwrap())
            .with_build_id("abc1234")
            .unwrap()
    }

    fn module(scope: &RootScope) -> Module {
        Module::new("worldguard-bukkit", scope.group(), scope.version().clone())
    }

    #[test]
    fn test_profile_names() {
        for profile in Profile::all() {
            assert_eq!(Profile::from_str(profile.name()), Some(profile));
        }
        assert_eq!(Profile::from_str("Platform-And-Core"), None);
    }

    #[test]
    fn test_unknown_profile() {
        let scope = scope();
        let mut module = module(&scope);
        let err = ProfileApplier::new(&scope)
            .apply(&mut module, "fabric", &ProfileOptions::default())
            .unwrap_err();
        assert!(matches!(err, BuildError::Configuration { ref module, .. } if module == "worldguard-bukkit"));
        assert!(module.applied_profiles.is_empty());
    }

    #[test]
    fn test_compile_step_records_internal_version() {
        let scope = scope();
        let mut module = module(&scope);
        ProfileApplier::new(&scope)
            .apply(&mut module, "platform-and-core", &ProfileOptions::default())
            .unwrap();

        assert_eq!(
            module.internal_version.as_ref().map(ToString::to_string).as_deref(),
            Some("7.0.9-SNAPSHOT+abc1234")
        );
        assert_eq!(module.compile.as_ref().map(|c| c.release), Some(17));
    }

    #[test]
    fn test_check_wiring() {
        let scope = scope();
        let mut module = module(&scope);
        let options = ProfileOptions {
            ban_slf4j: true,
            ..ProfileOptions::default()
        };
        ProfileApplier::new(&scope)
            .apply(&mut module, "platform-and-core", &options)
            .unwrap();

        assert_eq!(
            module.tasks.dependencies_of(names::CHECK),
            vec![
                names::CHECKSTYLE_MAIN,
                names::CHECKSTYLE_TEST,
                names::TEST,
                names::VERIFY_BANNED_DEPENDENCIES,
                names::VERIFY_PUBLICATION_POLICY,
            ]
        );
    }

    #[test]
    fn test_shadow_before_platform_fails() {
        let scope = scope();
        let mut module = module(&scope);
        let err = ProfileApplier::new(&scope)
            .apply(&mut module, "shadow-enabled", &ProfileOptions::default())
            .unwrap_err();
        assert!(matches!(err, BuildError::Configuration { .. }));
        assert!(module.merge_spec.is_none());
    }
}
