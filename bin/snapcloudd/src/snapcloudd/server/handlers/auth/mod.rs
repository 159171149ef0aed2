mod token;

pub use token::token;
