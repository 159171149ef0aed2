mod delete;
mod get;
mod list;
mod thumbnail;
mod upload;

pub use delete::delete;
pub use get::get;
pub use list::list;
pub use thumbnail::thumbnail;
pub use upload::upload;
