pub mod window_manager;
