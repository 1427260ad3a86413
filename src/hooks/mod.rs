pub mod status_hook;

pub use status_hook::{HookError, SessionStatusPayload, StatusHook, STATUS_HOOK_TYPE};
