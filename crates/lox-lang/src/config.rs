/// Which environment a function body is enclosed by when it runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClosureScope {
    // every call sees the globals only, never the locals around the declaration
    #[default]
    Global,
    // calls see the scope the `fun` statement was executed in
    Lexical,
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub closure_scope: ClosureScope,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            // overridden with --lexical-closures
            closure_scope: ClosureScope::Global,
        }
    }
}
