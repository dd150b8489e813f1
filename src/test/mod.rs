//! Builders for synthetic test images
//!
//! Real title modules can't be shipped with the crate, so tests assemble minimal XEX2 modules
//! and XDBF directories with the builders here.

mod xdbf;
mod xex;

pub use xdbf::{AchievementDef, XdbfBuilder};
pub use xex::XexBuilder;
