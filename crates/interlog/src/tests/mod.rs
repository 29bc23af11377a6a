//! Test module for interlog
//!
//! Property-based and scenario tests spanning several modules: template
//! rendering, masking, handler resolution, trace scopes and the full
//! interception lifecycle.


#[cfg(test)]
pub mod masking_tests;


#[cfg(test)]
pub mod trace_tests;

#[cfg(test)]
pub mod config_tests;
