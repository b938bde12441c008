pub mod project;
pub mod wiki;
pub mod work_item;
