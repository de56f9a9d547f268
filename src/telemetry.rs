//! Tracing setup for the CLI.
//!
//! - LOG_LEVEL holds the filter directives (default `warn,skill_mastery=info,essay_skill_mastery=info`).
//! - LOG_FORMAT=json switches to structured JSON lines.
//!
//! Logs go to stderr so command output on stdout stays pipeable.

use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .unwrap_or_else(|_| EnvFilter::new("warn,skill_mastery=info,essay_skill_mastery=info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().init(),
        _ => builder.init(),
    }
}
