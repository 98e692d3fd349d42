use serde::Deserialize;

/// Switches for a single analysis run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Warn about `$$a[..]` and `$o->$p[..]` without braces, which PHP 5 and
    /// PHP 7 evaluate differently.
    pub backward_compatibility_checks: bool,
    /// Skip speculative re-analysis of callees at call sites.
    pub quick_mode: bool,
}

impl AnalysisConfig {
    pub fn quick(mut self, quick_mode: bool) -> Self {
        self.quick_mode = quick_mode;
        self
    }

    pub fn backward_compatible(mut self, enabled: bool) -> Self {
        self.backward_compatibility_checks = enabled;
        self
    }
}
