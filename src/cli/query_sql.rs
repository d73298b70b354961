// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Translate archive query files into SQL.

use std::path::{Path, PathBuf};

use clap::Parser;
use log::{debug, info};

use super::{
    common::{load_config, InfoPrinter},
    OmpError,
};
use crate::query::ArchiveQuery;

#[derive(Parser, Debug)]
pub struct QuerySqlArgs {
    /// Path to the query XML file(s). One SQL statement is printed per file,
    /// in the order given.
    #[clap(name = "QUERY_XML", parse(from_os_str), required = true)]
    queries: Vec<PathBuf>,
}

impl QuerySqlArgs {
    pub fn run(&self, config_file: Option<&Path>) -> Result<(), OmpError> {
        let config = load_config(config_file)?;

        for file in &self.queries {
            debug!("Reading query {}", file.display());
            let xml = std::fs::read_to_string(file)?;
            let query = ArchiveQuery::from_xml(&xml, &config)?;

            let mut printer = InfoPrinter::new(format!("{}", file.display()).into());
            if let Some(telescope) = query.telescope() {
                printer.push_line(format!("Telescope: {telescope}").into());
            }
            if let Some(tables) = query.tables() {
                printer.push_line(format!("Tables:    {}", tables.join(", ")).into());
            }
            printer.display();

            let sql = query.sql()?;
            info!("SQL:");
            println!("{sql}");
        }

        Ok(())
    }
}
