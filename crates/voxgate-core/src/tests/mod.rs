mod debounce;
mod error_center;
mod runtime;
mod status;
