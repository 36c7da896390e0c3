mod burst_window;
#[allow(clippy::module_inception)]
mod error_center;
mod error_record;
