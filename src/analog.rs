//! Asynchronous ADC driver.
//!
//! Conversions run in their own embassy task. [`AsyncAdc::request`] hands the
//! channel to that task through a [`Signal`]; when the ADC interrupt reports
//! end of conversion the task stores the pin voltage and posts a completion
//! into [`INBOX`], which the dispatch loop drains.
//!
//! Only A0 (battery divider) is wired on this board; requests for other
//! channels complete with an error.

use embassy_stm32::Peri;
use embassy_stm32::adc::Adc;
use embassy_stm32::peripherals::{ADC1, PA0};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel, signal::Signal};
use meteo_node::adc::{AdcChannel, AdcCompletion, Analog, Inbox};
use meteo_node::config::{ADC_FULL_SCALE, ADC_VREF, INBOX_DEPTH};
use portable_atomic::{AtomicBool, AtomicU32, Ordering};

/// Completions waiting for the dispatch loop.
pub static INBOX: Inbox<CriticalSectionRawMutex, INBOX_DEPTH> = Channel::new();

/// Channel the ADC task should convert next.
static REQUEST: Signal<CriticalSectionRawMutex, AdcChannel> = Signal::new();

/// Last result per channel, as `f32` bits.
static RESULTS: [AtomicU32; AdcChannel::COUNT] = [const { AtomicU32::new(0) }; AdcChannel::COUNT];
static VALID: [AtomicBool; AdcChannel::COUNT] = [const { AtomicBool::new(false) }; AdcChannel::COUNT];

fn store(channel: AdcChannel, volts: Option<f32>) {
    let i = channel.index();
    match volts {
        Some(volts) => {
            RESULTS[i].store(volts.to_bits(), Ordering::Relaxed);
            VALID[i].store(true, Ordering::Release);
        }
        None => VALID[i].store(false, Ordering::Release),
    }
}

/// Handle used by the application to start conversions.
pub struct AsyncAdc;

impl Analog for AsyncAdc {
    fn request(&mut self, channel: AdcChannel) {
        REQUEST.signal(channel);
    }

    fn read_result(&mut self, channel: AdcChannel) -> Option<f32> {
        let i = channel.index();
        VALID[i]
            .load(Ordering::Acquire)
            .then(|| f32::from_bits(RESULTS[i].load(Ordering::Relaxed)))
    }
}

/// Async task performing the conversions.
///
/// # Arguments
///
/// * `adc` - ADC1 bound to its interrupt
/// * `a0` - Battery divider output pin (takes ownership)
#[embassy_executor::task]
pub async fn adc_task(mut adc: Adc<'static, ADC1>, mut a0: Peri<'static, PA0>) {
    loop {
        let channel = REQUEST.wait().await;

        let completion = match channel {
            AdcChannel::A0 => {
                let raw = adc.read(&mut a0).await;
                store(channel, Some(f32::from(raw) * ADC_VREF / ADC_FULL_SCALE));
                AdcCompletion::done(channel)
            }
            _ => {
                store(channel, None);
                AdcCompletion::error(channel)
            }
        };

        #[cfg(feature = "debug-mode")]
        defmt::debug!("conversion on {} finished", channel);

        INBOX.send(completion).await;
    }
}
