// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Consolidate the MSBs of science programmes.

use std::{
    borrow::Cow,
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use clap::Parser;
use log::{debug, info};
use rayon::prelude::*;

use super::{
    common::{InfoPrinter, Warn},
    OmpError,
};
use crate::msb::{MsbRecord, ScienceProgram};

#[derive(Parser, Debug)]
pub struct MsbConsolidateArgs {
    /// Path to the science programme XML file(s).
    #[clap(name = "SCIPROG_XML", parse(from_os_str), required = true)]
    programmes: Vec<PathBuf>,

    /// Write each consolidated programme into this directory, keeping its
    /// file name. Nothing is written if this isn't given.
    #[clap(short, long, parse(from_os_str))]
    output_dir: Option<PathBuf>,
}

impl MsbConsolidateArgs {
    pub fn run(&self) -> Result<(), OmpError> {
        if let Some(dir) = &self.output_dir {
            std::fs::create_dir_all(dir)?;
        }

        // Programmes are independent, so they're consolidated in parallel.
        // Reporting happens afterwards to keep the output in order.
        let results: Vec<Result<ScienceProgram, OmpError>> = self
            .programmes
            .par_iter()
            .map(|file| consolidate_file(file))
            .collect();

        for (file, result) in self.programmes.iter().zip(results) {
            let programme = result?;
            report(file, &programme);

            match &self.output_dir {
                Some(dir) => write_programme(file, dir, &programme)?,
                None if programme.changed() => format!(
                    "{} was changed by consolidation, but no --output-dir was given",
                    file.display()
                )
                .warn(),
                None => (),
            }
        }

        Ok(())
    }
}

fn consolidate_file(file: &Path) -> Result<ScienceProgram, OmpError> {
    debug!("Reading science programme {}", file.display());
    let xml = std::fs::read_to_string(file)?;
    let mut programme = ScienceProgram::parse(&xml)?;
    programme.consolidate()?;
    Ok(programme)
}

fn report(file: &Path, programme: &ScienceProgram) {
    let msbs = programme.msbs();
    let title = match programme.project_id() {
        Some(p) => format!("{} (project {p})", file.display()),
        None => format!("{}", file.display()),
    };
    let mut printer = InfoPrinter::new(title.into());
    printer.push_line(format!("{} MSBs", msbs.len()).into());
    for msb in msbs {
        printer.push_block(describe(msb));
    }
    printer.display();

    if msbs.is_empty() {
        format!("{} has no MSBs", file.display()).warn();
    }
}

fn describe(msb: &MsbRecord) -> Vec<Cow<'static, str>> {
    let remaining = if msb.is_removed() {
        "withdrawn".to_string()
    } else {
        msb.remaining.to_string()
    };
    let mut block: Vec<Cow<'static, str>> = vec![
        format!("MSB '{}'", msb.title).into(),
        format!("  remaining:  {remaining}").into(),
        format!("  targets:    {}", msb.target_summary).into(),
        format!("  instrument: {}", msb.instrument_summary).into(),
    ];
    if let Some(t) = msb.time_estimate {
        block.push(format!("  estimate:   {t:.0} s").into());
    }
    block.push(format!("  checksum:   {}", msb.checksum).into());
    block
}

fn write_programme(file: &Path, dir: &Path, programme: &ScienceProgram) -> Result<(), OmpError> {
    let name = file
        .file_name()
        .ok_or_else(|| OmpError::Generic(format!("'{}' has no file name", file.display())))?;
    let out = dir.join(name);
    let mut f = BufWriter::new(File::create(&out)?);
    f.write_all(programme.to_xml().as_bytes())?;
    f.flush()?;
    info!("Wrote {}", out.display());
    Ok(())
}
