#[macro_use]
extern crate rust_i18n;

// Load all translations from the locales directory
i18n!("locales", fallback = "en");

pub mod db;
pub mod hooks;
pub mod queue;
pub mod server;
pub mod sessions;
pub mod version;
pub mod webhooks;

#[cfg(test)]
mod test_support;
