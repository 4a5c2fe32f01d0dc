pub mod history;
pub mod price;
pub mod signals;

pub use history::*;
pub use price::*;
pub use signals::*;
