#![cfg_attr(target_arch = "avr", no_std, no_main, feature(abi_avr_interrupt))]

#[cfg(target_arch = "avr")]
mod hil {
    use avr_device::atmega128a::Peripherals;
    use panic_halt as _;

    use mcu_timer::diagnostics;
    use mcu_timer::hal::uart::SerialLog;
    use mcu_timer::hal::Tc1;
    use mcu_timer::irq::AvrIrq;
    use mcu_timer::testing::{
        ClockMonotonic, SetNextClamp, TestCase, TestRunner, TrySetNextSchedule, TrySetNextWait,
    };

    // The inline wait opens short interrupt windows; the flag is cleared on
    // vector entry and nothing else needs doing here.
    #[avr_device::interrupt(atmega128a)]
    fn TIMER1_COMPA() {}

    #[avr_device::entry]
    fn main() -> ! {
        let Some(dp) = Peripherals::take() else {
            diagnostics::halt(&AvrIrq)
        };
        SerialLog::init(&dp.USART0);
        let mut timer = Tc1::init(dp.TC1, &dp.CPU).into_timer();
        avr_device::interrupt::disable();

        let mut runner = TestRunner::new();

        let clock_tests: [&dyn TestCase; 1] = [&ClockMonotonic];
        let arming_tests: [&dyn TestCase; 3] =
            [&SetNextClamp, &TrySetNextWait, &TrySetNextSchedule];

        runner.run_suite("Clock", &mut timer, &clock_tests);
        runner.run_suite("Arming", &mut timer, &arming_tests);

        if !runner.all_passed() {
            mcu_timer::log_error!("timer HIL tests failed");
        }
        diagnostics::halt(&AvrIrq)
    }
}

#[cfg(not(target_arch = "avr"))]
fn main() {
    eprintln!("timer_hil only runs on an ATmega128 target");
}
