//! Entry-point variants
//!
//! Both variants run the same detection; they differ in which flags reach the
//! downstream tool and in how it is started.

pub mod early;
pub mod general;
