//! Shared HTTP plumbing for the producer and gateway services

pub mod response;
