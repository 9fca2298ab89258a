mod bit_probability;

pub use self::bit_probability::*;
