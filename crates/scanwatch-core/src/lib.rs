pub mod config;
pub mod logging;

pub mod api;
pub mod credentials;
pub mod error;
pub mod job;
pub mod lifecycle;
pub mod notify;
pub mod poller;
pub mod progress;
pub mod scheduler;
pub mod status;
pub mod submit;

#[cfg(test)]
mod testing;
