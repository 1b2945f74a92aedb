//! End-to-end tests over the public library API.

mod flow_tests;
