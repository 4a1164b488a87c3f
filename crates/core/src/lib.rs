//! Face location, age/gender estimation and running detection statistics
//! for a stream of encoded video frames.

pub mod demographics;
pub mod detection;
pub mod pipeline;
pub mod shared;
pub mod statistics;
