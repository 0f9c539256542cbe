pub mod ads;
pub mod blacklist;
pub mod jobs;
