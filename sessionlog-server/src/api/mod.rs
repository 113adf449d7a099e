//! HTTP API handlers for sessionlog-server

pub mod health;
pub mod owner;
pub mod sessions;
pub mod trackable_objects;

pub use health::health_routes;
pub use owner::{Owner, OWNER_HEADER};
pub use sessions::{
    get_session, list_aggregates, list_all_sessions, list_sessions, reaggregate_session,
    upload_session,
};
pub use trackable_objects::{list_trackable_objects, upload_trackable_object};
