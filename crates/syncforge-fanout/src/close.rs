/// Transport close codes spec.md §6 names.
pub const HEARTBEAT_OR_SHUTDOWN: u16 = 1001;
pub const AUTH_FAILURE_OR_TIMEOUT: u16 = 1008;
pub const INTERNAL_ERROR: u16 = 1011;
pub const OVERLOAD: u16 = 1013;
