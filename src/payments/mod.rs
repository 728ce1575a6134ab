mod checkout;
mod polling;

pub use checkout::*;
pub use polling::*;
