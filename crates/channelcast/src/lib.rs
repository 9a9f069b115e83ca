pub mod bumper;
pub mod concat;
pub mod config;
pub mod epg;
pub mod database;
pub mod entities;
pub mod errors;
pub mod models;
pub mod observability;
pub mod playlist;
pub mod runtime;
pub mod schedule;
pub mod transcoder;
pub mod utils;
pub mod viewer;
pub mod web;
