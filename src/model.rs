pub mod application;
pub mod layout;
pub mod path;

pub use application::Application;
pub use layout::{
    Layout, PinnedLayout, SCREEN_PRIMARY, ScreenKey, ScreenSet, default_screen_set,
    find_matching_screen_set,
};
pub use path::{Path, PathVisitor, walk_path};
