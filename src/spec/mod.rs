mod flatten;
mod load;
mod order;
pub mod pointer;
mod preprocess;
mod types;
mod validate;


pub use flatten::*;
pub use load::*;
pub use order::*;
pub use preprocess::*;
pub use types::*;
pub use validate::*;
