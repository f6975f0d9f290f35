//! Plant disease detection service.
//!
//! Classifies uploaded leaf images with a pretrained PlantVillage model and
//! relays farming questions to the KrishiMitra chat assistant.

pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod services;
pub mod startup;
