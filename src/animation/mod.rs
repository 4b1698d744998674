pub mod director;
pub mod ease;
pub mod timeline;
