pub mod catalog;
pub mod hierarchy;
pub mod locks;
pub mod recommend;
pub mod store;
