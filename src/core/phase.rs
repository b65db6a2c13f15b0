//! Story lifecycle vocabulary.

use std::fmt;

/// One step of a story's lifecycle, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    /// Resolve inherited attributes and isolation.
    Inherit,
    /// Call action registration hooks.
    Register,
    /// Run set-up, before hooks, action bodies, after hooks.
    Boot,
    /// Run assertions and the expectation checker.
    Assert,
    /// Run the tear-down hook.
    Teardown,
}

impl Phase {
    /// All phases in execution order.
    pub const ALL: [Phase; 5] = [
        Phase::Inherit,
        Phase::Register,
        Phase::Boot,
        Phase::Assert,
        Phase::Teardown,
    ];

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Inherit => "inherit",
            Phase::Register => "register",
            Phase::Boot => "boot",
            Phase::Assert => "assert",
            Phase::Teardown => "teardown",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful outcome of a story run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// Every phase ran and the expectation held.
    Passed,
    /// Isolation excluded the story; only teardown ran.
    Skipped,
}
