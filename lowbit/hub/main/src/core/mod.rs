pub mod hub_api;
