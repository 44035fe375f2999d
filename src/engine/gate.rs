use crate::engine::settings::Division;

/// Smoothing constant for gate gain moves: short enough to read as rhythm,
/// long enough not to click.
pub const GATE_TAU_SEC: f32 = 0.003;

/// One gate sub-event within a sixteenth-note tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GateEvent {
    /// Offset from the tick's start, in ticks (samples).
    pub offset: u64,
    /// Target gain: 1.0 open, `max(0, 1 - mix)` closed.
    pub level: f32,
}

/// Maps (pattern, division, step, mix) to the time-ordered gain events for
/// one sixteenth-note tick.
///
/// Fast divisions emit several evenly spaced sub-events inside the tick;
/// slow divisions fire only on step indices that are exact multiples of the
/// interval, resolved with integer modulo arithmetic so they cannot drift.
pub fn resolve(
    pattern: &[bool],
    division: Division,
    step: usize,
    mix: f32,
    ticks_per_sixteenth: f64,
) -> Vec<GateEvent> {
    if pattern.is_empty() {
        return Vec::new();
    }
    let mix = mix.clamp(0.0, 1.0);
    let closed = (1.0 - mix).max(0.0);
    let level = |open: bool| if open { 1.0 } else { closed };

    let nps = division.notes_per_sixteenth();
    if nps >= 1.0 {
        let k = nps as usize;
        (0..k)
            .map(|i| {
                let idx = (step * k + i) % pattern.len();
                GateEvent {
                    offset: (i as f64 * ticks_per_sixteenth / k as f64).round() as u64,
                    level: level(pattern[idx]),
                }
            })
            .collect()
    } else {
        let interval = division.ticks_per_event();
        if step % interval != 0 {
            return Vec::new();
        }
        let idx = (step / interval) % pattern.len();
        vec![GateEvent {
            offset: 0,
            level: level(pattern[idx]),
        }]
    }
}
