pub mod adserver;
pub mod encore;
pub mod osc;
pub mod redis;
