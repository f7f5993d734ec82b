pub mod attribute;
pub mod category;
pub mod common;
pub mod family;
pub mod family_variant;
pub mod product;

pub use attribute::*;
pub use category::*;
pub use common::*;
pub use family::*;
pub use family_variant::*;
pub use product::*;
