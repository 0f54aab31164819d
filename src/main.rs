#![cfg_attr(target_arch = "avr", no_std, no_main, feature(abi_avr_interrupt))]

#[cfg(target_arch = "avr")]
mod firmware {
    use core::cell::{Cell, RefCell};

    use avr_device::atmega128a::Peripherals;
    use avr_device::interrupt::{self, CriticalSection, Mutex};
    use panic_halt as _;

    use mcu_timer::diagnostics::{self, Diagnostics};
    use mcu_timer::hal::uart::SerialLog;
    use mcu_timer::hal::{Tc1, Tc1Timer};
    use mcu_timer::heartbeat::Heartbeat;
    use mcu_timer::irq::AvrIrq;
    use mcu_timer::{is_before, log_info, LogicalTick, TimerTask, WakeTimer, TIMER_TASKS};

    const HEARTBEAT_US: u32 = 500;
    const REPORT_EVERY_MS: u32 = 1000;

    // Global state for interrupt handling
    static TIMER: Mutex<RefCell<Option<Tc1Timer>>> = Mutex::new(RefCell::new(None));
    static HEARTBEAT: Mutex<RefCell<Heartbeat>> = Mutex::new(RefCell::new(Heartbeat::new()));
    // Set by the ISR when the main loop held the timer
    static MISSED: Mutex<Cell<bool>> = Mutex::new(Cell::new(false));

    fn service(cs: CriticalSection) {
        let heartbeat = HEARTBEAT.borrow(cs).try_borrow_mut();
        let timer = TIMER.borrow(cs).try_borrow_mut();
        match (heartbeat, timer) {
            (Ok(mut heartbeat), Ok(mut timer)) => {
                if let Some(timer) = timer.as_mut() {
                    timer.on_interrupt(&mut *heartbeat);
                }
            }
            _ => MISSED.borrow(cs).set(true),
        }
    }

    #[avr_device::interrupt(atmega128a)]
    fn TIMER1_COMPA() {
        interrupt::free(service);
    }

    fn with_timer<R>(f: impl FnOnce(&mut Tc1Timer) -> R) -> Option<R> {
        interrupt::free(|cs| TIMER.borrow(cs).borrow_mut().as_mut().map(f))
    }

    fn stop(diag: &mut Diagnostics, reason: &'static str, now: LogicalTick) -> ! {
        diag.report_reason(reason, now);
        diagnostics::halt(&AvrIrq)
    }

    #[avr_device::entry]
    fn main() -> ! {
        let mut diag = Diagnostics::new();
        let Some(dp) = Peripherals::take() else {
            diagnostics::halt(&AvrIrq)
        };
        SerialLog::init(&dp.USART0);
        log_info!("mcu_timer v{}", env!("CARGO_PKG_VERSION"));

        let mut timer = Tc1::init(dp.TC1, &dp.CPU).into_timer();
        let period = timer.ticks_for_us(HEARTBEAT_US);
        let ms = timer.ticks_for_us(1000);

        let started = interrupt::free(|cs| {
            HEARTBEAT.borrow(cs).borrow_mut().start(&mut timer, period)
        });
        if let Err(err) = started {
            stop(&mut diag, err.reason(), timer.read_time());
        }
        interrupt::free(|cs| {
            TIMER.borrow(cs).replace(Some(timer));
        });

        // Enable interrupts globally
        unsafe { interrupt::enable() };

        let mut next_periodic = ms;
        let mut ms_count = 0u32;

        loop {
            for task in TIMER_TASKS {
                match task {
                    TimerTask::Periodic => {
                        let ran = with_timer(|timer| {
                            if is_before(timer.read_time(), next_periodic) {
                                return false;
                            }
                            timer.run_task(task);
                            true
                        });
                        if ran == Some(true) {
                            next_periodic = next_periodic.wrapping_add(ms);
                            ms_count += 1;
                        }
                    }
                    TimerTask::Idle => {
                        with_timer(|timer| timer.run_task(task));
                        // the idle task reopens interrupts before the
                        // timer is released; replay anything it hid
                        interrupt::free(|cs| {
                            if MISSED.borrow(cs).replace(false) {
                                service(cs);
                            }
                        });
                    }
                }
            }

            let (shutdown, beats) = interrupt::free(|cs| {
                let heartbeat = HEARTBEAT.borrow(cs).borrow();
                (heartbeat.shutdown_reason(), heartbeat.beats())
            });
            if let Some(reason) = shutdown {
                let now = with_timer(|timer| timer.read_time()).unwrap_or(0);
                stop(&mut diag, reason, now);
            }
            if ms_count >= REPORT_EVERY_MS {
                ms_count = 0;
                log_info!("heartbeat: {} beats", beats);
            }
        }
    }
}

/// Host build: report what the simulator backend declares.
#[cfg(not(target_arch = "avr"))]
fn main() {
    use mcu_timer::{ConstValue, SimTimer, WakeTimer, DECLARED_CONSTANTS, TIMER_TASKS};

    let mut timer = SimTimer::new();
    for task in TIMER_TASKS {
        timer.run_task(task);
    }

    println!("mcu_timer v{} (simulator)", env!("CARGO_PKG_VERSION"));
    for constant in DECLARED_CONSTANTS.iter() {
        match constant.value {
            ConstValue::Int(v) => println!("  {} = {}", constant.name, v),
            ConstValue::Str(s) => println!("  {} = {:?}", constant.name, s),
        }
    }
    println!("  time = {}", timer.read_time());
}
