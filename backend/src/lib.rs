//! Household chore-tracking engine: completion lifecycle, weekly point cap,
//! parent confirmation, allowance calculation, and dashboard event fan-out.

pub mod config;
pub mod db;
pub mod domain;
pub mod events;
pub mod rest;
pub mod storage;
