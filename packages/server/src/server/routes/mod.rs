// HTTP routes
pub mod csv_info;
pub mod errors;
pub mod health;
pub mod index;
pub mod positions;
pub mod status;

pub use csv_info::*;
pub use errors::*;
pub use health::*;
pub use index::*;
pub use positions::*;
pub use status::*;
