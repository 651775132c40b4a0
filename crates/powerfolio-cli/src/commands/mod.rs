pub mod completions;
pub mod export;
pub mod inspect;
pub mod solve;
pub mod validate;
