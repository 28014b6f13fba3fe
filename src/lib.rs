pub mod assertion;
pub mod config;
pub mod driver;
pub mod error;
pub mod report;
pub mod runner;
pub mod suites;

// Re-export common items
pub use driver::list_browsers;
pub use report::generate_report;
pub use runner::run_tests;
