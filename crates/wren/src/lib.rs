// lib.rs - Library root shared by the binary, benchmarks and integration tests.

pub mod backend;
pub mod builtins;
pub mod call_context;
pub mod checker;
pub mod cli;
pub mod config;
pub mod cross_file;
pub mod definition;
pub mod error;
pub mod handlers;
pub mod lexical;
pub mod perf;
pub mod signature;
pub mod state;
pub mod symbols;
pub mod udf_header;
pub mod utf16;
pub mod workspace_symbols;

// test_utils is available in test builds and when the `test-support` feature is enabled.
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
