pub mod api;
pub mod form_data;
pub mod logging;
