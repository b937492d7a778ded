use crate::aggregator::VibeSnapshot;

const METER_WIDTH: usize = 20;

/// One terminal line: label, signed average, meter, newest message.
pub fn render_snapshot(snapshot: &VibeSnapshot) -> String {
    let vibe = snapshot.vibe;
    let filled = (vibe.display_fraction * METER_WIDTH as f64).round() as usize;
    let filled = filled.min(METER_WIDTH);
    let meter = format!("{}{}", "#".repeat(filled), ".".repeat(METER_WIDTH - filled));

    let newest = snapshot
        .feed
        .first()
        .map(|message| format!(" | {:+.2} \"{}\"", message.sentiment_score, message.content.trim()))
        .unwrap_or_else(|| " | the arena is silent".to_string());

    format!(
        "[{:<8}] {:+.2} [{meter}] ({} in window){newest}",
        vibe.label.as_str(),
        vibe.average_score,
        snapshot.window_len
    )
}
