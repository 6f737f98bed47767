use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

#[derive(Clone)]
pub struct NarrationMetrics {
    pub pointer_events: IntCounter,
    pub decode_errors: IntCounter,
    pub narrations: IntCounter,
    pub batches: IntCounter,
    pub pending_messages: IntGauge,
}

#[derive(Clone)]
pub struct MetricsHub {
    pub registry: Registry,
    pub narration: NarrationMetrics,
}

impl MetricsHub {
    pub fn new() -> Result<Self, String> {
        let registry = Registry::new();
        let pointer_events = IntCounter::new(
            "rm_pointer_events_total",
            "Program pointer values received",
        )
        .map_err(|e| format!("metrics init error: {e}"))?;
        let decode_errors = IntCounter::new(
            "rm_decode_errors_total",
            "Program pointer values that could not be decoded",
        )
        .map_err(|e| format!("metrics init error: {e}"))?;
        let narrations = IntCounter::new("rm_narrations_total", "Narration messages queued")
            .map_err(|e| format!("metrics init error: {e}"))?;
        let batches = IntCounter::new("rm_batches_total", "Message pairs displayed and spoken")
            .map_err(|e| format!("metrics init error: {e}"))?;
        let pending_messages =
            IntGauge::new("rm_pending_messages", "Messages waiting for a display slot")
                .map_err(|e| format!("metrics init error: {e}"))?;
        let narration = NarrationMetrics {
            pointer_events,
            decode_errors,
            narrations,
            batches,
            pending_messages,
        };
        let _ = registry.register(Box::new(narration.pointer_events.clone()));
        let _ = registry.register(Box::new(narration.decode_errors.clone()));
        let _ = registry.register(Box::new(narration.narrations.clone()));
        let _ = registry.register(Box::new(narration.batches.clone()));
        let _ = registry.register(Box::new(narration.pending_messages.clone()));
        Ok(Self {
            registry,
            narration,
        })
    }

    pub fn encode_text(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            return format!("error encoding metrics: {e}");
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}
