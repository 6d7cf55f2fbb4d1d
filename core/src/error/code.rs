/// Stable numeric codes for every failure the engines can surface.
///
/// The CLI maps these onto process exit codes; library callers can use them to
/// branch without matching on individual error variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    Success = 0,
    GeneralError = 1,
    ValidationError = 3,
    RetryExhausted = 4,
    MissingPrerequisites = 5,
    TaskNotFound = 10,
    DependencyError = 11,
    CircularDependency = 12,
    SchedulerConfig = 13,
    AgentError = 20,
    Timeout = 30,
    Cancelled = 31,
    StateError = 40,
    ConfigError = 41,
}

impl ErrorCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}
