//! Patient Sim - Simulated Dental Patient Conversation Engine
//!
//! This crate implements the conversation core for dental clinical training:
//! a clinician exchanges turns with a simulated patient persona whose
//! underlying pathology is hidden from the conversation.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
