use log::warn;
use rand as rnd;

use crate::signal::SimObject;
use crate::trigger::Trigger;
use crate::value::Val;
use crate::TbResult;

/// Free-running clock task. Fork it once per clock domain.
pub async fn clock(clk: SimObject, period: u64, unit: &str) -> TbResult {
    let high_t = period / 2;
    let low_t = period - high_t;
    if period % 2 != 0 {
        warn!(
            "clock period {period}{unit} not dividable by 2. High time will be {high_t}{unit}; low time will be {low_t}{unit}."
        );
    }
    loop {
        clk.set(0);
        Trigger::timer(low_t, unit).await;
        clk.set(1);
        Trigger::timer(high_t, unit).await;
    }
}

pub async fn clock_cycles(signal: SimObject, n_cycles: u32) -> TbResult {
    for _ in 0..n_cycles {
        signal.rising_edge().await;
    }
    Ok(Val::None)
}

#[inline]
pub fn rand() -> f32 {
    rnd::random::<f32>()
}

#[inline]
pub fn rand_int(ceil: u32) -> u32 {
    rnd::random::<u32>() % ceil
}

#[inline]
pub fn rand_u32() -> u32 {
    rnd::random::<u32>()
}
