//! Raspberry Pi GPIO bindings for the axis output lines.
//!
//! The step input is pulsed by a dedicated software timing thread (the
//! kernel sysfs interface has no hardware PWM), which keeps the 50% duty
//! contract of [`PulseOutput`] good enough for the step rates a geared dish
//! axis sees.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    thread,
    time::Duration,
};

use sysfs_gpio::Pin;
use tracing::warn;

use crate::hardware::{DigitalOutput, HardwareError, MIN_PULSE_HZ, PulseOutput};

fn output_pin(number: u64) -> Result<Pin, sysfs_gpio::Error> {
    let pin = Pin::new(number);
    pin.export()?;
    pin.set_direction(sysfs_gpio::Direction::Out)?;
    pin.set_value(0)?;
    Ok(pin)
}

/// One exported sysfs GPIO line driven as an output.
pub struct GpioOutput {
    pin: Pin,
}

impl GpioOutput {
    pub fn new(number: u64) -> Result<Self, HardwareError> {
        let pin = output_pin(number)
            .map_err(|e| HardwareError::DigitalOutput(format!("pin {number}: {e}")))?;
        Ok(Self { pin })
    }

    fn set(&mut self, value: u8) -> Result<(), HardwareError> {
        self.pin
            .set_value(value)
            .map_err(|e| HardwareError::DigitalOutput(format!("pin {}: {e}", self.pin.get_pin())))
    }
}

impl DigitalOutput for GpioOutput {
    fn set_high(&mut self) -> Result<(), HardwareError> {
        self.set(1)
    }

    fn set_low(&mut self) -> Result<(), HardwareError> {
        self.set(0)
    }
}

impl Drop for GpioOutput {
    fn drop(&mut self) {
        let _ = self.pin.set_value(0);
        let _ = self.pin.unexport();
    }
}

/// Software-timed pulse generator on a GPIO line.
///
/// A background thread toggles the step pin at the commanded frequency while
/// started; frequency changes take effect on the next half-period.
pub struct SoftPulse {
    frequency_bits: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl SoftPulse {
    pub fn new(pin_number: u64) -> Result<Self, HardwareError> {
        let pin = output_pin(pin_number)
            .map_err(|e| HardwareError::PulseChannel(format!("pin {pin_number}: {e}")))?;

        let frequency_bits = Arc::new(AtomicU64::new(0f64.to_bits()));
        let running = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(AtomicBool::new(false));

        let thread_frequency = frequency_bits.clone();
        let thread_running = running.clone();
        let thread_shutdown = shutdown.clone();

        let thread = thread::Builder::new()
            .name(format!("pulse-gpio{pin_number}"))
            .spawn(move || {
                pulse_thread(pin, thread_frequency, thread_running, thread_shutdown)
            })
            .map_err(|e| HardwareError::PulseChannel(format!("pulse thread: {e}")))?;

        Ok(Self {
            frequency_bits,
            running,
            shutdown,
            thread: Some(thread),
        })
    }
}

fn pulse_thread(
    pin: Pin,
    frequency_bits: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
) {
    const IDLE_POLL: Duration = Duration::from_millis(1);

    while !shutdown.load(Ordering::Relaxed) {
        if !running.load(Ordering::Relaxed) {
            thread::sleep(IDLE_POLL);
            continue;
        }

        let hz = f64::from_bits(frequency_bits.load(Ordering::Relaxed));
        if hz < MIN_PULSE_HZ {
            thread::sleep(IDLE_POLL);
            continue;
        }

        let half_period = Duration::from_secs_f64(0.5 / hz);
        if let Err(e) = pin.set_value(1).and_then(|_| {
            thread::sleep(half_period);
            pin.set_value(0)
        }) {
            warn!("pulse pin {} write failed: {e}", pin.get_pin());
            thread::sleep(IDLE_POLL);
            continue;
        }
        thread::sleep(half_period);
    }

    let _ = pin.set_value(0);
    let _ = pin.unexport();
}

impl PulseOutput for SoftPulse {
    fn set_frequency(&mut self, hz: f64) -> Result<(), HardwareError> {
        if !hz.is_finite() || hz < MIN_PULSE_HZ {
            return Err(HardwareError::InvalidFrequency(hz));
        }
        self.frequency_bits.store(hz.to_bits(), Ordering::Relaxed);
        Ok(())
    }

    fn start(&mut self) -> Result<(), HardwareError> {
        self.running.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), HardwareError> {
        self.running.store(false, Ordering::Relaxed);
        Ok(())
    }
}

impl Drop for SoftPulse {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
