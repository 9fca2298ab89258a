mod range_integer;
mod spatial_context;

pub use self::{range_integer::*, spatial_context::*};
