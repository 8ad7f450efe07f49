//! Dice sounds using the Web Audio API
//!
//! Both sounds are synthesized; there are no sample files.

use web_sys::{AudioContext, AudioContextState, GainNode, OscillatorNode, OscillatorType};

use crate::consts::CLACK_MIN_IMPACT;

/// Audio output for the table
pub struct DiceAudio {
    ctx: Option<AudioContext>,
    master_volume: f32,
    muted: bool,
}

impl Default for DiceAudio {
    fn default() -> Self {
        Self::new()
    }
}

impl DiceAudio {
    pub fn new() -> Self {
        // Fails outside a secure context
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - audio disabled");
        }
        Self {
            ctx,
            master_volume: 0.8,
            muted: false,
        }
    }

    /// Resume the context (must run inside a user gesture)
    pub fn resume(&self) {
        if let Some(ctx) = &self.ctx {
            if ctx.state() == AudioContextState::Suspended {
                let _ = ctx.resume();
            }
        }
    }

    /// Set master volume (0.0 - 1.0)
    pub fn set_master_volume(&mut self, vol: f32) {
        self.master_volume = vol.clamp(0.0, 1.0);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn effective_volume(&self) -> f32 {
        if self.muted { 0.0 } else { self.master_volume }
    }

    /// Context ready to play, or `None` while suspended or silent
    fn live_context(&self) -> Option<(&AudioContext, f32)> {
        let vol = self.effective_volume();
        if vol <= 0.0 {
            return None;
        }
        let ctx = self.ctx.as_ref()?;
        if ctx.state() == AudioContextState::Suspended {
            return None;
        }
        Some((ctx, vol))
    }

    /// Create an oscillator routed through a gain node
    fn create_osc(
        &self,
        ctx: &AudioContext,
        freq: f32,
        osc_type: OscillatorType,
    ) -> Option<(OscillatorNode, GainNode)> {
        let osc = ctx.create_oscillator().ok()?;
        let gain = ctx.create_gain().ok()?;

        osc.set_type(osc_type);
        osc.frequency().set_value(freq);
        osc.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(&ctx.destination()).ok()?;

        Some((osc, gain))
    }

    /// Die contact. Soft touches below the impact floor stay silent.
    pub fn play_clack(&self, impact_speed: f32) {
        if impact_speed <= CLACK_MIN_IMPACT {
            return;
        }
        let Some((ctx, vol)) = self.live_context() else {
            return;
        };
        let freq = 800.0 + impact_speed * 100.0;
        let Some((osc, gain)) = self.create_osc(ctx, freq, OscillatorType::Triangle) else {
            return;
        };
        let t = ctx.current_time();

        gain.gain()
            .set_value_at_time((impact_speed / 10.0).min(0.3) * vol, t)
            .ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.001, t + 0.1)
            .ok();
        osc.frequency().set_value_at_time(freq, t).ok();
        osc.frequency()
            .exponential_ramp_to_value_at_time(100.0, t + 0.1)
            .ok();

        osc.start().ok();
        osc.stop_with_when(t + 0.1).ok();
    }

    /// Dice came to rest and were read
    pub fn play_thud(&self) {
        let Some((ctx, vol)) = self.live_context() else {
            return;
        };
        let Some((osc, gain)) = self.create_osc(ctx, 120.0, OscillatorType::Sine) else {
            return;
        };
        let t = ctx.current_time();

        gain.gain().set_value_at_time(0.4 * vol, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.001, t + 0.2)
            .ok();
        osc.frequency().set_value_at_time(120.0, t).ok();
        osc.frequency()
            .exponential_ramp_to_value_at_time(40.0, t + 0.1)
            .ok();

        osc.start().ok();
        osc.stop_with_when(t + 0.2).ok();
    }
}
