mod config_files;
mod control_cycle;
mod ignition;
mod support;
