pub mod consultation;
pub mod delivery;
pub mod diagnosis;
pub mod enums;
pub mod filters;
pub mod patient;
pub mod program;
pub mod referral;
pub mod user;

pub use consultation::*;
pub use delivery::*;
pub use diagnosis::*;
pub use enums::*;
pub use filters::*;
pub use patient::*;
pub use program::*;
pub use referral::*;
pub use user::*;
