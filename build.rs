use std::env;
use std::fs;
use std::path::PathBuf;

// Must match hal::uart::LOG_BAUD
const LOG_BAUD: u32 = 38_400;
// UBRR = CLOCK_FREQ / (16 * baud) - 1 has to stay >= 0
const MIN_AVR_CLOCK_FREQ: u32 = 16 * LOG_BAUD;

struct Board {
    mcu: String,
    clock_freq: u32,
    clock_divider: Option<u8>,
}

fn default_board(target: &str) -> Board {
    if target.contains("avr") {
        Board {
            mcu: "atmega128".into(),
            clock_freq: 16_000_000,
            clock_divider: None,
        }
    } else if env::var("CARGO_FEATURE_SAM3X8E").is_ok() {
        // TC0 runs from TIMER_CLOCK1 (MCK / 2)
        Board {
            mcu: "sam3x8e".into(),
            clock_freq: 42_000_000,
            clock_divider: None,
        }
    } else {
        Board {
            mcu: "simulator".into(),
            clock_freq: 0,
            clock_divider: None,
        }
    }
}

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR not set"));
    let target = env::var("TARGET").expect("TARGET not set");

    println!("cargo:rerun-if-env-changed=MCU_TIMER_MCU");
    println!("cargo:rerun-if-env-changed=MCU_TIMER_CLOCK_FREQ");
    println!("cargo:rerun-if-env-changed=MCU_TIMER_XDIV");
    println!("cargo:rerun-if-changed=build.rs");

    let mut board = default_board(&target);

    if let Ok(mcu) = env::var("MCU_TIMER_MCU") {
        board.mcu = mcu;
    }
    if let Ok(freq) = env::var("MCU_TIMER_CLOCK_FREQ") {
        board.clock_freq = freq
            .parse()
            .unwrap_or_else(|_| panic!("MCU_TIMER_CLOCK_FREQ is not a number: {}", freq));
    }
    if let Ok(xdiv) = env::var("MCU_TIMER_XDIV") {
        let xdiv: u8 = xdiv
            .parse()
            .unwrap_or_else(|_| panic!("MCU_TIMER_XDIV is not a byte: {}", xdiv));
        if xdiv < 129 {
            panic!("MCU_TIMER_XDIV must be in 129..=255 (XDIVEN set), got {}", xdiv);
        }
        board.clock_divider = Some(xdiv);
    }

    if target.contains("avr") && board.clock_freq < MIN_AVR_CLOCK_FREQ {
        panic!(
            "MCU_TIMER_CLOCK_FREQ must be at least {} Hz for the {} baud log port, got {}",
            MIN_AVR_CLOCK_FREQ, LOG_BAUD, board.clock_freq
        );
    }

    if target.contains("avr") {
        println!("cargo:rustc-link-arg=-mmcu=atmega128");
    }

    let divider = match board.clock_divider {
        Some(v) => format!("Some({})", v),
        None => "None".to_string(),
    };
    let generated = format!(
        "/// Identifying name of the hardware target.\n\
         pub const MCU: &str = {:?};\n\
         /// Counter clock frequency in Hz.\n\
         pub const CLOCK_FREQ: u32 = {};\n\
         /// Value programmed into the system clock divider at init, if any.\n\
         pub const CLOCK_DIVIDER: Option<u8> = {};\n",
        board.mcu, board.clock_freq, divider
    );
    fs::write(out_dir.join("board.rs"), generated).expect("failed to write board.rs");

    println!(
        "cargo:warning=Building for {} at {} Hz",
        board.mcu, board.clock_freq
    );
}
