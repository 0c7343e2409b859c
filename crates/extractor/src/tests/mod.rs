mod error_tests;
mod helpers;
