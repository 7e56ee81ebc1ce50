pub mod bindings;
pub mod modal;
