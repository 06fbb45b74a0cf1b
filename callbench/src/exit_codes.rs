#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Run completed, including a signal-triggered monitor shutdown.
    Success = 0,

    /// Login failed; no tier was executed.
    AuthenticationFailed = 20,

    /// Invalid CLI/config/options: bad flags, empty tiers, unreadable config or database url.
    InvalidInput = 30,

    /// Internal/runtime error: report writes, seeding failures, task panics.
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}
