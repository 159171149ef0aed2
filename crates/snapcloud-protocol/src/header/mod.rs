mod range;

pub use range::RangeHeader;
