mod flush;
mod health;
mod version;

pub use flush::flush;
pub use health::health;
pub use version::version;
