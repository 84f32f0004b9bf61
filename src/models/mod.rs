//! # Planet data model
//!
//! The context every output is rendered from: the planet itself, the feeds
//! it subscribes to and the posts merged out of them.

mod planet;
mod post;
mod subscription;

pub use planet::Planet;
pub use post::Post;
pub use subscription::Subscription;
