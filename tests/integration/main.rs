//! End-to-end tests against the public engine API.

mod concurrency;
mod harness;
mod scenarios;
mod workers;
