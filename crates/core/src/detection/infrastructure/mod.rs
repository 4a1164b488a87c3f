pub mod cascade_face_locator;
pub mod haar_cascade;
pub mod integral_image;
pub mod locator_factory;
pub mod math;
pub mod null_face_locator;
pub mod rect_grouping;
