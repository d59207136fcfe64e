mod common;
mod controller_tests;
