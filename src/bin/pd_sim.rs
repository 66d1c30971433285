//! Desktop simulator for the PD adapter.
//!
//! Runs the real control loop against the mock peripherals and prints what
//! the OLED would show once per simulated second.
//!
//! # Usage
//!
//! ```bash
//! # 20 simulated seconds, 1 A load, 3.3-11 V PPS supply
//! cargo run --bin pd_sim
//!
//! # 5 minutes at 2.5 A from a 21 V capable charger
//! cargo run --bin pd_sim -- 300 2500 21000
//! ```
//!
//! INC is held for the first two seconds, so the requested voltage climbs
//! from 5 V before settling.

use anyhow::{bail, Context};
use log::{info, LevelFilter, Log, Metadata, Record};
use pd_adapter::hal::{
    MockButtons, MockClock, MockDelay, MockDisplay, MockPd, MockSensor, MockTime,
};
use pd_adapter::render::{LINE_1, LINE_2};
use pd_adapter::traits::Button;
use pd_adapter::{AdapterConfig, PdAdapter, Peripherals};

/// Lowest PPS voltage the simulated charger offers (mV)
const SUPPLY_MIN_MV: u16 = 3300;

/// Cable and shunt resistance used to derive the measured voltage (mOhm)
const PATH_RESISTANCE_MOHM: u32 = 80;

/// How long INC is held at the start (ms)
const RAMP_MS: u32 = 2000;

/// Time one loop iteration takes outside its delays (ms)
const TICK_COST_MS: u32 = 1;

struct StdoutLogger;

impl Log for StdoutLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        println!("[{:5}] {}", record.level(), record.args());
    }

    fn flush(&self) {}
}

static LOGGER: StdoutLogger = StdoutLogger;

fn arg<T: core::str::FromStr>(args: &[String], index: usize, default: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match args.get(index) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("invalid argument {}: {:?}", index, raw)),
        None => Ok(default),
    }
}

fn main() -> anyhow::Result<()> {
    log::set_logger(&LOGGER).map_err(|e| anyhow::anyhow!("logger: {}", e))?;
    log::set_max_level(LevelFilter::Debug);

    let args: Vec<String> = std::env::args().collect();
    let seconds: u32 = arg(&args, 1, 20)?;
    let load_ma: u16 = arg(&args, 2, 1000)?;
    let supply_max_mv: u16 = arg(&args, 3, 11000)?;
    if supply_max_mv < SUPPLY_MIN_MV {
        bail!(
            "supply maximum {} mV is below the PPS minimum of {} mV",
            supply_max_mv,
            SUPPLY_MIN_MV
        );
    }

    println!();
    println!("================================");
    println!("  pd-adapter simulator");
    println!("================================");
    println!();

    let time = MockTime::new();
    let config = AdapterConfig::default();
    let default_mv = config.default_mv;
    let peripherals = Peripherals {
        display: MockDisplay::new(),
        sensor: MockSensor::new(default_mv, load_ma),
        pd: MockPd::pps(SUPPLY_MIN_MV, supply_max_mv),
        clock: MockClock::new(&time),
        delay: MockDelay::new(&time),
        buttons: MockButtons::new(&time),
    };

    let mut adapter = PdAdapter::new(config, peripherals);
    adapter.start().context("adapter startup")?;
    adapter.buttons_mut().press_for(Button::Increase, RAMP_MS);

    let end_ms = seconds.saturating_mul(1000);
    let mut next_print_ms = 0;
    while time.now() < end_ms {
        // The bus follows the last request, minus the drop across the path.
        let supplied = adapter.pd().last_request().unwrap_or(default_mv);
        let drop_mv = u32::from(load_ma) * PATH_RESISTANCE_MOHM / 1000;
        let measured = u32::from(supplied).saturating_sub(drop_mv);
        adapter.sensor_mut().voltage_mv = u16::try_from(measured).unwrap_or(u16::MAX);

        adapter.tick();
        time.advance(TICK_COST_MS);

        if time.now() >= next_print_ms {
            let display = adapter.display();
            println!(
                "t={:>4}s  |{:<16}|  |{:<16}|",
                time.now() / 1000,
                display.line_text(LINE_1),
                display.line_text(LINE_2)
            );
            next_print_ms += 1000;
        }
    }

    let status = adapter.status();
    info!(
        "done: {} mV requested, {} uWh, {} uAh over {} s",
        status.requested_mv, status.energy_uwh, status.charge_uah, status.elapsed_seconds
    );
    Ok(())
}
