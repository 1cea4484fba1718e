//! Edges facing the outside world: redirect URLs in, rendered effects out.

pub mod console;
pub mod redirect;
