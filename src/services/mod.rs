/// Business logic layer
pub mod comments;
pub mod follows;
pub mod groups;
pub mod posts;

pub use comments::CommentService;
pub use follows::FollowService;
pub use groups::GroupService;
pub use posts::PostService;
