// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The main omp binary.

use clap::Parser;

use omp::Omp;

fn main() {
    // Run omp, only performing extra steps if it returns an error.
    if let Err(e) = Omp::parse().run() {
        // Print out the error message.
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
