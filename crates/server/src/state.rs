use std::sync::Arc;

use facestat_core::pipeline::process_frame_use_case::ProcessFrameUseCase;
use facestat_core::statistics::statistics_aggregator::StatisticsAggregator;

/// Shared by every HTTP request and socket session.
pub struct AppState {
    pub pipeline: Arc<ProcessFrameUseCase>,
    pub statistics: Arc<StatisticsAggregator>,
}
