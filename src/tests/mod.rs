//! Unit and scenario tests for the DriveDesk client.
//!
//! The state modules are exercised against the in-memory doubles in
//! [`support`]; the REST client runs against an in-process axum server.
//!
//! ## Test Modules
//!
//! - **filter_tests**: Filter token encoding
//! - **directory_tests**: Listing, pagination, reconciliation and stale responses
//! - **breadcrumb_tests**: Breadcrumb trail and folder navigation
//! - **search_tests**: Debounced search
//! - **upload_tests**: Upload lifecycle with push progress
//! - **share_tests**: Permission-checked sharing
//! - **push_tests**: STOMP frames and subscriptions
//! - **session_tests**: Session persistence and the session store
//! - **error_tests**: Error mapping and validation
//! - **config_tests**: Configuration loading and validation
//! - **api_tests**: REST client against a mock backend
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test
//! cargo test directory_tests
//! ```

pub mod support;

pub mod breadcrumb_tests;
pub mod error_tests;
pub mod push_tests;
pub mod share_tests;
