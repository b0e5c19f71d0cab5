use core::fmt;

/// Which of the three observable states a value is in.
///
/// Shared by [`Und`](crate::Und) and [`Elastic`](crate::Elastic).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum State {
    /// The field was absent.
    #[default]
    Undefined,
    /// The field was present with an explicit `null`.
    Null,
    /// The field carried a value.
    Defined,
}

impl State {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            State::Undefined => "undefined",
            State::Null => "null",
            State::Defined => "defined",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
