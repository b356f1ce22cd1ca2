//! Rendering of outbound messages.

pub mod email;
