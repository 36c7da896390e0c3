mod level_throttle;
mod status_bus;
mod status_mirror;
