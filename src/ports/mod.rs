pub mod config_provider;
