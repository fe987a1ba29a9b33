pub mod dto;
pub mod model_slot;
pub mod ports;
pub mod services;
