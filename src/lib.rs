//! Clinician Portal - authentication core of a clinician patient portal
//!
//! This library provides session management, the auth state machine and the
//! mock patient directory behind the portal's views.

pub mod config;
pub mod context;
pub mod models;
pub mod services;
pub mod storage;
pub mod view;
