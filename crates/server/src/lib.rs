pub mod access;
pub mod auth;
pub mod config;
pub mod db;
pub mod error_convert;
pub mod guard;
pub mod health;
pub mod openapi;
pub mod pages;
pub mod rate_limit;
pub mod rest;
pub mod telemetry;
