#![cfg_attr(not(test), no_std)]

pub(crate) mod fmt;

pub mod clock;
pub mod reader;
pub mod record;
pub mod sampler;

pub mod config {
    include!(concat!(env!("OUT_DIR"), "/consts.rs"));
}
