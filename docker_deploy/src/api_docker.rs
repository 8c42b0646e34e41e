mod api_runtime;
mod helpers;

pub use api_runtime::*;
pub use helpers::*;
