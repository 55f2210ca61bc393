#![doc = include_str!("../../README.md")]
pub mod cancel;
pub mod config;
pub mod constants;
pub mod detector_ids;
pub mod encoding;
pub mod error;
pub mod event;
pub mod fpga_check;
pub mod geometry;
pub mod ingest;
pub mod order;
pub mod process;
pub mod roa_reader;
pub mod roa_writer;
pub mod sim_file;
pub mod worker_status;
