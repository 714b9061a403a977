//! Compile-time and render-time configuration.

/// Options fixed when a template is compiled.
///
/// The three whitespace switches mirror Jinja2's environment settings of
/// the same names; `autoescape` makes every output of a non-safe string go
/// through HTML escaping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Options {
    /// Drop the first newline after a statement or comment tag.
    pub trim_blocks: bool,
    /// Strip spaces and tabs from the start of a line up to a statement or comment tag.
    pub lstrip_blocks: bool,
    /// Keep a single trailing newline at the end of the template.
    pub keep_trailing_newline: bool,
    /// Escape `& < > " '` in every output that is not marked safe.
    pub autoescape: bool,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trim_blocks(mut self, on: bool) -> Self {
        self.trim_blocks = on;
        self
    }

    pub fn with_lstrip_blocks(mut self, on: bool) -> Self {
        self.lstrip_blocks = on;
        self
    }

    pub fn with_keep_trailing_newline(mut self, on: bool) -> Self {
        self.keep_trailing_newline = on;
        self
    }

    pub fn with_autoescape(mut self, on: bool) -> Self {
        self.autoescape = on;
        self
    }
}

/// How lookups of names that are not bound anywhere behave.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum UndefinedBehavior {
    /// Missing names evaluate to an undefined value that prints as nothing.
    #[default]
    Lenient,
    /// Missing names, keys and indices raise an error.
    Strict,
}

/// Default limit on nested macro and function calls.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Options chosen per render call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderOptions {
    /// Treatment of names that are not bound.
    pub undefined: UndefinedBehavior,
    /// Maximum call depth before a `RecursionError` is raised.
    pub max_depth: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            undefined: UndefinedBehavior::Lenient,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl RenderOptions {
    pub fn strict() -> Self {
        Self {
            undefined: UndefinedBehavior::Strict,
            ..Self::default()
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
