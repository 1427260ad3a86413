/// Release version, taken from `TICKETBRIDGE_VERSION` at build time when set
/// (CI stamps tags there), otherwise the crate version.
pub const VERSION: &str = match option_env!("TICKETBRIDGE_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};
