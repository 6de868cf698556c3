mod fixtures;
pub(crate) mod utils;
