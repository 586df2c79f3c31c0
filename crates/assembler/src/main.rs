// Copyright (c) 2025 the assembler project contributors, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and LICENSE.additional.

use std::fs;
use std::process::ExitCode;

use clap::Parser as ClapParser;

use asm_assembler::{driver, elf};

#[derive(ClapParser)]
#[command(name = "assembler", about = "AT&T x86-64 assembler, emits ET_REL ELF64 objects")]
struct Cli {
    /// Assembly source file.
    input: String,
    /// Path the ELF64 object is written to.
    output: String,
}

fn run(cli: &Cli) -> Result<(), asm_types::error::AsmError> {
    let source = fs::read_to_string(&cli.input)?;
    let object = driver::assemble_source(&source)?;
    let bytes = elf::build(&object);
    fs::write(&cli.output, bytes)?;
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
