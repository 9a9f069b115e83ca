//! Structured metrics for the channel runtime, built on an OpenTelemetry
//! `Meter`. Optionally exports via OTLP when `otlp_endpoint` is configured,
//! otherwise metrics are recorded but not shipped anywhere.

use opentelemetry::global;
use opentelemetry::metrics::{Counter, Histogram, Meter, UpDownCounter};
use opentelemetry_sdk::metrics::SdkMeterProvider;

use crate::config::ObservabilityConfig;

pub struct RuntimeObservability {
    _meter: Meter,
    pub channel_state_transitions: Counter<u64>,
    pub transcoder_starts: Counter<u64>,
    pub transcoder_stops: Counter<u64>,
    pub bumper_generation_duration_ms: Histogram<f64>,
    pub bumper_generation_failures: Counter<u64>,
    pub concat_file_writes: Counter<u64>,
    pub progression_tick_duration_ms: Histogram<f64>,
    pub schedule_block_transitions: Counter<u64>,
    pub epg_cache_hits: Counter<u64>,
    pub epg_cache_misses: Counter<u64>,
    pub viewer_session_edges: Counter<u64>,
    pub streaming_channels: UpDownCounter<i64>,
}

impl RuntimeObservability {
    pub fn new(config: &ObservabilityConfig) -> Self {
        if let Some(endpoint) = &config.otlp_endpoint {
            init_otlp_meter_provider(&config.service_name, endpoint);
        }

        let meter = global::meter(config.service_name.clone());
        Self::build_with_instruments(meter)
    }

    fn build_with_instruments(meter: Meter) -> Self {
        let channel_state_transitions = meter
            .u64_counter("channel.state_transitions")
            .with_description("Number of channel state-machine transitions")
            .build();
        let transcoder_starts = meter
            .u64_counter("transcoder.starts")
            .with_description("Number of transcoder subprocess starts")
            .build();
        let transcoder_stops = meter
            .u64_counter("transcoder.stops")
            .with_description("Number of transcoder subprocess stops")
            .build();
        let bumper_generation_duration_ms = meter
            .f64_histogram("bumper.generation_duration_ms")
            .with_description("Bumper generation latency in milliseconds")
            .build();
        let bumper_generation_failures = meter
            .u64_counter("bumper.generation_failures")
            .with_description("Number of failed bumper generations")
            .build();
        let concat_file_writes = meter
            .u64_counter("concat.file_writes")
            .with_description("Number of concat manifest writes")
            .build();
        let progression_tick_duration_ms = meter
            .f64_histogram("progression.tick_duration_ms")
            .with_description("Progression loop tick latency in milliseconds")
            .build();
        let schedule_block_transitions = meter
            .u64_counter("schedule.block_transitions")
            .with_description("Number of dynamic schedule-block transitions")
            .build();
        let epg_cache_hits = meter
            .u64_counter("epg.cache_hits")
            .with_description("EPG program-list cache hits")
            .build();
        let epg_cache_misses = meter
            .u64_counter("epg.cache_misses")
            .with_description("EPG program-list cache misses")
            .build();
        let viewer_session_edges = meter
            .u64_counter("viewer.session_edges")
            .with_description("First-viewer/last-viewer-gone edge events")
            .build();
        let streaming_channels = meter
            .i64_up_down_counter("channel.streaming_count")
            .with_description("Number of channels currently STREAMING")
            .build();

        Self {
            _meter: meter,
            channel_state_transitions,
            transcoder_starts,
            transcoder_stops,
            bumper_generation_duration_ms,
            bumper_generation_failures,
            concat_file_writes,
            progression_tick_duration_ms,
            schedule_block_transitions,
            epg_cache_hits,
            epg_cache_misses,
            viewer_session_edges,
            streaming_channels,
        }
    }
}

fn init_otlp_meter_provider(service_name: &str, endpoint: &str) {
    use opentelemetry_otlp::WithExportConfig;

    let exporter = match opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
    {
        Ok(exporter) => exporter,
        Err(e) => {
            tracing::warn!(error = %e, "failed to build OTLP metric exporter, metrics stay local");
            return;
        }
    };

    let provider = SdkMeterProvider::builder()
        .with_periodic_exporter(exporter)
        .with_resource(
            opentelemetry_sdk::Resource::builder()
                .with_service_name(service_name.to_string())
                .build(),
        )
        .build();

    global::set_meter_provider(provider);
}
