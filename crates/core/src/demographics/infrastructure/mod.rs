pub mod estimator_factory;
pub mod onnx_age_gender_estimator;
pub mod onnx_session;
pub mod random_estimator;
