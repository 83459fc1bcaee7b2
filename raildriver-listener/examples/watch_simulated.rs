//! Watch a simulated cab for changes
//!
//! Run with `RAILDRIVER_LOG_MODE=development` to see the worker's own logs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use raildriver_api::{virtual_index, LocoInfo, RailDriver, SimulatedDriver};
use raildriver_listener::logging::init_logging_from_env;
use raildriver_listener::prelude::*;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    init_logging_from_env()?;

    let sim = Arc::new(SimulatedDriver::new());
    sim.load_loco(
        LocoInfo::new("DTG", "Class 90 Pack", "Class 90 DRS"),
        [
            ("Regulator", 0.0, 0.0, 1.0),
            ("TrainBrakeControl", 0.8, 0.0, 1.0),
            ("SpeedometerMPH", 0.0, 0.0, 125.0),
        ],
    );
    sim.set_virtual(virtual_index::FUEL_LEVEL, 1.0);
    sim.set_virtual(virtual_index::HOURS, 6.0);

    let listener = Listener::with_config(
        RailDriver::new(Arc::clone(&sim)),
        ListenerConfig::fast(),
    )?;

    listener.subscribe(&["Regulator", "TrainBrakeControl", "SpeedometerMPH"])?;
    for field in listener.subscribed_fields() {
        let label = field.clone();
        listener.on_change(&field, move |new, old| {
            println!("  {:<18} {} -> {}", label, old, new);
            Ok(())
        });
    }
    for special in SpecialField::ALL {
        listener.bind(special.event_name(), move |new, old| {
            println!("  {:<18} {} -> {}", special.name(), old, new);
            Ok(())
        });
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    listener.start()?;
    println!("Driving for 30 seconds (Ctrl+C to quit)...\n");

    let mut step = 0u32;
    while running.load(Ordering::SeqCst) && step < 150 {
        thread::sleep(Duration::from_millis(200));
        step += 1;

        let regulator = (step as f32 / 100.0).min(1.0);
        sim.set_current("Regulator", regulator)?;
        sim.set_current("TrainBrakeControl", if step > 5 { 0.0 } else { 0.8 })?;
        sim.set_current("SpeedometerMPH", regulator * 110.0)?;
        sim.set_virtual(virtual_index::FUEL_LEVEL, 1.0 - step as f32 / 1000.0);
        sim.set_virtual(virtual_index::SECONDS, (step / 5 % 60) as f32);
        if step % 50 == 0 {
            let in_tunnel = step % 100 == 50;
            sim.set_virtual(virtual_index::IN_TUNNEL, if in_tunnel { 1.0 } else { 0.0 });
        }

        if !listener.is_running() {
            break;
        }
    }

    listener.stop();

    if let Some(snapshot) = listener.snapshot() {
        println!("\nLast snapshot:");
        for (key, value) in snapshot.iter() {
            let label = match SpecialField::from_key(key) {
                Some(field) => field.name(),
                None => key,
            };
            println!("  {:<18} {}", label, value);
        }
    }

    match listener.last_error() {
        Some(fault) => println!("\nListener stopped with a fault: {}", fault),
        None => println!("\nDone after {} iterations", listener.iteration()),
    }

    Ok(())
}
