#![forbid(unsafe_code)]

pub mod greet;
