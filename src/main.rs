use std::env::args;
use std::str::FromStr;
use std::string::ToString;

use strum::IntoEnumIterator;
use strum_macros::{self, Display, EnumIter, EnumString};
use tracing_subscriber::EnvFilter;

mod demo;

fn main() -> Result<(), String> {
    // RUST_LOG=debug shows what the threads do
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    args()
        .nth(1)
        .ok_or(format!(
            "no demo supplied, use one of {} or see unit tests",
            Demo::iter()
                .map(|d| d.to_string())
                .collect::<Vec<String>>()
                .join(",")
        ))
        .and_then(|selector| Demo::from_str(&selector).map_err(|e| e.to_string()))
        .and_then(|demo| match demo {
            Demo::Mutexes => demo::mutexes(),
            Demo::LockPair => demo::lock_pair(),
            Demo::Condvar => demo::condvar(),
            Demo::Threads => demo::threads(),
            Demo::Priorities => demo::priorities(),
            Demo::CallStack => demo::call_stack(),
        })
}

#[derive(EnumIter, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
enum Demo {
    Mutexes,
    LockPair,
    Condvar,
    Threads,
    Priorities,
    CallStack,
}
