pub mod asset;
pub mod gps_track;
pub mod survey;
pub mod user;
pub mod video;
