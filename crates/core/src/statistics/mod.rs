pub mod detection_statistics;
pub mod statistics_aggregator;
