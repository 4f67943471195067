//! User-facing strings shared by every front end.

pub const APP_NAME: &str = "Mini Social";
pub const APP_TAGLINE: &str = "A simple social platform for sharing messages with the community.";

pub const AUTH_FAILED: &str = "Authentication failed. Please try again.";
pub const NETWORK_ERROR: &str = "Network error. Please check your connection.";
pub const PERMISSION_DENIED: &str = "You do not have permission to perform this action.";
pub const POST_LOAD_ERROR: &str = "Failed to load posts. Please refresh the page.";
pub const POST_CREATE_ERROR: &str = "Failed to create post. Please try again.";
pub const POST_UPDATE_ERROR: &str = "Failed to update post. Please try again.";
pub const POST_DELETE_ERROR: &str = "Failed to delete post. Please try again.";
pub const LOGIN_FAILED: &str = "Failed to login. Please check your credentials.";
pub const REGISTER_FAILED: &str = "Failed to register. Please try again.";
pub const LOGOUT_FAILED: &str = "Failed to logout. Please try again.";

pub const POST_CREATED: &str = "Post created successfully!";
pub const POST_UPDATED: &str = "Post updated successfully!";
pub const POST_DELETED: &str = "Post deleted successfully!";
pub const LOGIN_SUCCESS: &str = "Welcome back!";
pub const REGISTER_SUCCESS: &str = "Account created successfully!";
pub const LOGOUT_SUCCESS: &str = "Logged out successfully.";

pub const DELETE_CONFIRM: &str = "Are you sure you want to delete this post?";
pub const LOADING_POSTS: &str = "Loading posts...";
pub const EMPTY_FEED_TITLE: &str = "No posts yet";
pub const EMPTY_FEED_HINT: &str = "Be the first to share something!";
pub const NOT_FOUND_TITLE: &str = "Page Not Found";
pub const NOT_FOUND_HINT: &str = "Sorry, we couldn't find the page you're looking for.";

/// Display name used when a post has no author email.
pub const UNKNOWN_AUTHOR: &str = "Unknown";
