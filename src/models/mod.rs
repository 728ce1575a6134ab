mod license;
mod payment;
mod product;
mod user;

pub use license::*;
pub use payment::*;
pub use product::*;
pub use user::*;
