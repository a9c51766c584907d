/// Settings of one resolution engine. Each engine owns its own copy, so engines serving
/// different projects never see each other's aliases or ignore lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Supertypes never attached as extensions, e.g. the universal base object the caller
    /// already models natively.
    pub ignored_supertypes: Vec<String>,
    /// Packages tried, in order, for names given without a package.
    pub default_packages: Vec<String>,
    /// Also complete zero-argument `getX()`/`isX()` methods as an `x` property.
    pub bean_properties: bool,
    /// Extra alias to qualified-name pairs, applied over the built-in aliases.
    pub aliases: Vec<(String, String)>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ignored_supertypes: vec!["java.lang.Object".to_string()],
            default_packages: vec!["java.lang".to_string()],
            bean_properties: false,
            aliases: vec![],
        }
    }
}

impl EngineConfig {
    pub fn ignore_supertype(mut self, qualified: impl Into<String>) -> Self {
        self.ignored_supertypes.push(qualified.into());
        self
    }

    pub fn default_package(mut self, package: impl Into<String>) -> Self {
        self.default_packages.push(package.into());
        self
    }

    pub fn bean_properties(mut self, enabled: bool) -> Self {
        self.bean_properties = enabled;
        self
    }

    pub fn alias(mut self, alias: impl Into<String>, qualified: impl Into<String>) -> Self {
        self.aliases.push((alias.into(), qualified.into()));
        self
    }

    pub(crate) fn is_ignored(&self, qualified: &str) -> bool {
        self.ignored_supertypes.iter().any(|ignored| ignored == qualified)
    }
}
