//! Probe command - sandbox worker entry point
//!
//! The scan command re-invokes the `oni` binary as `oni probe` for every
//! trial. The worker reads one probe request from stdin, times the match
//! against the deliberately backtracking matcher, and writes one response
//! line to stdout. The parent enforces the wall-clock budget by killing the
//! whole process, so nothing here needs to watch the clock.

use anyhow::Result;
use clap::Args;
use oni_core::sandbox::run_worker;
use std::io;

#[derive(Args, Debug)]
pub struct ProbeArgs {}

impl ProbeArgs {
    pub fn run(&self) -> Result<()> {
        let mut reader = io::stdin().lock();
        let mut writer = io::stdout().lock();
        run_worker(&mut reader, &mut writer)?;
        Ok(())
    }
}
