//! Punto de entrada ("driver").
//!
//! Este módulo orquesta las fases del proceso de compilación y expone
//! una CLI. Antes del análisis léxico concatena los módulos instalados
//! bajo `kinetrix_modules/` con el archivo principal en un único flujo
//! fuente; al final escribe el artefacto generado y sugiere los pasos de
//! carga propios del objetivo.

use anyhow::Context;
use clap::{crate_version, Arg, Command};
use kinetrix::codegen::{self, Target};
use kinetrix::{parse, pins};

use std::fs;
use std::path::Path;
use std::process;

/// Máximo de errores reportados por compilación.
const MAX_ERRORS: usize = 10;

fn main() -> anyhow::Result<()> {
    let args = Command::new("Kinetrix compiler")
        .version(crate_version!())
        .arg(
            Arg::new("source")
                .required(true)
                .value_name("SOURCE")
                .help("Kinetrix source file (.kx)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .takes_value(true)
                .value_name("FILE")
                .help("Output file"),
        )
        .arg(
            Arg::new("target")
                .short('t')
                .long("target")
                .takes_value(true)
                .value_name("TARGET")
                .default_value("arduino")
                .possible_values(["arduino", "esp32", "rpi", "pico", "ros2"])
                .help("Target platform"),
        )
        .arg(
            Arg::new("diagnostics")
                .long("diagnostics")
                .takes_value(false)
                .help("Scan the program for GPIO pin usage and print a summary"),
        )
        .get_matches();

    let input = args.value_of("source").unwrap();
    let target: Target = args
        .value_of("target")
        .unwrap()
        .parse()
        .expect("clap allowed a bad target");

    let output = match args.value_of("output") {
        Some(path) => String::from(path),
        None => format!("Kinetrix_Output{}", target.extension()),
    };

    println!("Kinetrix V3.1 Multi-Target Compiler");
    println!("=====================================");
    println!("Input:  {}", input);
    println!("Output: {}", output);
    println!("Target: {}\n", target.name());

    let source = merge_sources(input)?;

    println!("Parsing...");
    let mut program = match parse::parse(&source, MAX_ERRORS) {
        Ok(program) => program,
        Err(errors) => {
            eprintln!("\nCompilation failed with {} error(s):", errors.len());
            for error in errors.iter() {
                eprintln!("  {}", error);
            }

            process::exit(1);
        }
    };
    println!("✓ Parsing successful");

    if args.is_present("diagnostics") {
        program.pins_used = pins::track_pins(&program);
        if !program.pins_used.is_empty() {
            println!("Found {} GPIO pins", program.pins_used.len());
        }
    }

    println!("Generating {} code...", target.name());
    let code = codegen::generate(target, &program);
    fs::write(&output, code).with_context(|| format!("Failed to write output: {}", output))?;
    println!("✓ Code generation successful\n");

    println!("✓ Compilation successful!");
    println!("Generated: {}\n", output);

    print_next_steps(target, &output);
    Ok(())
}

/// Concatena los módulos instalados y el archivo principal en un único
/// flujo fuente, en ese orden.
fn merge_sources(input: &str) -> anyhow::Result<String> {
    let mut merged = String::new();

    if let Ok(entries) = fs::read_dir("kinetrix_modules") {
        let mut modules: Vec<_> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.file_name())
            .filter(|name| !name.to_string_lossy().starts_with('.'))
            .collect();

        // Orden estable para que la compilación sea determinista
        modules.sort();

        for module in modules {
            let index = Path::new("kinetrix_modules").join(&module).join("index.kx");
            if let Ok(text) = fs::read_to_string(&index) {
                merged.push_str(&text);
                merged.push('\n');
            }
        }
    }

    let main_text =
        fs::read_to_string(input).with_context(|| format!("Failed to read source file: {}", input))?;
    merged.push_str(&main_text);

    Ok(merged)
}

fn print_next_steps(target: Target, output: &str) {
    println!("Next steps:");
    match target {
        Target::Arduino => {
            println!("  Open {} in Arduino IDE, select your board and upload", output);
            println!("  OR: arduino-cli compile --fqbn arduino:avr:uno .");
        }

        Target::Esp32 => {
            println!("  Open {} in Arduino IDE with the ESP32 board package", output);
            println!("  Select: Tools, Board, ESP32 Dev Module, then Upload");
        }

        Target::Rpi => {
            println!("  pip install RPi.GPIO Adafruit-MCP3008");
            println!("  python3 {}", output);
        }

        Target::Pico => {
            println!("  Install MicroPython on your Pico first");
            println!("  Then: mpremote copy {} :main.py", output);
            println!("  OR:   open it in Thonny IDE and run");
        }

        Target::Ros2 => {
            println!("  Place {} in your ROS2 package src/", output);
            println!("  colcon build && ros2 run <pkg> kinetrix_node");
        }
    }
}
