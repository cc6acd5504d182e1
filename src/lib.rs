//! # DriveDesk Client Library
//!
//! Client-state core for a cloud document drive: the listing of the current
//! folder, the filters narrowing it, breadcrumb navigation and uploads with
//! live progress pushed by the server.
//!
//! ## Architecture
//!
//! The library is built using:
//! - **Tokio**: async runtime driving fetches, debounce timers and push listeners
//! - **Reqwest**: REST calls to the drive backend
//! - **Tokio-Tungstenite**: STOMP over WebSocket for upload progress
//! - **Serde**: the backend's JSON payloads
//!
//! Each state module is split into a pure state machine (no I/O, unit
//! tested directly) and an async driver that talks to the backend through
//! the traits in [`api`].
//!
//! ## Core Components
//!
//! - [`config`]: Layered client configuration
//! - [`error`]: Error type, HTTP status mapping and input validation
//! - [`types`]: Wire types (items, pages, push payloads, permissions)
//! - [`session`]: Login session and token storage
//! - [`metrics`]: Client-side counters
//! - [`notify`]: Transient user notifications
//! - [`api`]: REST client and backend traits
//! - [`filter`]: Encoding of list filters into query tokens
//! - [`directory`]: Listing of the current folder with pagination
//! - [`search`]: Debounced metadata search
//! - [`breadcrumb`]: Navigation and breadcrumb trail
//! - [`push`]: STOMP push channel
//! - [`upload`]: Upload orchestration and progress tracking
//! - [`share`]: Permission-checked sharing
//! - [`editor`]: Document editor configuration

pub mod api;
pub mod breadcrumb;
pub mod config;
pub mod directory;
pub mod editor;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod notify;
pub mod push;
pub mod search;
pub mod session;
pub mod share;
pub mod types;
pub mod upload;

#[cfg(test)]
mod tests;
