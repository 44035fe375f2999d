/// One-pole exponential approach toward a target value.
///
/// All audible parameter motion goes through one of these; writing a step
/// discontinuity onto a live signal clicks.
#[derive(Clone, Copy, Debug)]
pub struct Smoother {
    current: f32,
    target: f32,
    alpha: f32,
    tau_sec: f32,
    sample_dt: f32,
}

pub fn alpha_for_tau(tau_sec: f32, sample_dt: f32) -> f32 {
    if tau_sec <= 0.0 {
        return 1.0;
    }
    1.0 - (-sample_dt / tau_sec).exp()
}

impl Smoother {
    pub fn new(value: f32, tau_sec: f32, fs: f32) -> Self {
        let sample_dt = 1.0 / fs.max(1.0);
        Self {
            current: value,
            target: value,
            alpha: alpha_for_tau(tau_sec, sample_dt),
            tau_sec,
            sample_dt,
        }
    }

    pub fn value(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn tau_sec(&self) -> f32 {
        self.tau_sec
    }

    pub fn set_target(&mut self, target: f32) {
        if target.is_finite() {
            self.target = target;
        }
    }

    pub fn set_tau(&mut self, tau_sec: f32) {
        if tau_sec.is_finite() && tau_sec >= 0.0 {
            self.tau_sec = tau_sec;
            self.alpha = alpha_for_tau(tau_sec, self.sample_dt);
        }
    }

    /// Jump without smoothing. Only valid before any signal flows.
    pub fn reset(&mut self, value: f32) {
        self.current = value;
        self.target = value;
    }

    pub fn tick(&mut self) -> f32 {
        self.current += (self.target - self.current) * self.alpha;
        self.current
    }
}
