pub mod bitmap_font;
pub mod detection_result;
pub mod frame_codec;
pub mod overlay;
pub mod process_frame_use_case;
