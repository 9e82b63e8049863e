mod context;
mod handlers;
mod main_menu;

pub use context::AppContext;
pub use main_menu::show_main_menu;
