// src/lib.rs

// Modules publics, utilisés par le binaire `sniper` et les tests d'intégration.
pub mod config;
pub mod control;
pub mod decoders;
pub mod execution;
pub mod filtering;
pub mod listener;
pub mod monitoring;
pub mod rpc;
pub mod state;
