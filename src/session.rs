//! Line-driven interactive counting session.
//!
//! Commands, one per line:
//!
//! - `s` capture a frame, count the coins and print the result
//! - `c` show the reference radius and prompt for a new one
//! - `d` toggle debug output (per-circle radius and ratio)
//! - `q` quit
//!
//! End of input ends the session like `q`.

use anyhow::Result;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::counter::CoinCounter;
use crate::detection::CircleDetector;
use crate::frames::FrameSource;
use crate::models::ReferenceRadius;

const HELP: &str = "Commands: s = count coins, c = set reference radius, d = toggle debug, q = quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Scan,
    Configure,
    ToggleDebug,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "s" => Some(Self::Scan),
            "c" => Some(Self::Configure),
            "d" => Some(Self::ToggleDebug),
            "h" | "?" => Some(Self::Help),
            "q" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// What happened during a session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSummary {
    pub scans: usize,
    pub last_total: Option<f64>,
}

pub struct Session<S: FrameSource, D: CircleDetector> {
    source: S,
    counter: CoinCounter<D>,
    currency_symbol: String,
    debug: bool,
    /// Annotated frames are written here as scan_NNN.png
    snapshot_dir: Option<PathBuf>,
}

impl<S: FrameSource, D: CircleDetector> Session<S, D> {
    pub fn new(source: S, counter: CoinCounter<D>, currency_symbol: impl Into<String>) -> Self {
        Self {
            source,
            counter,
            currency_symbol: currency_symbol.into(),
            debug: false,
            snapshot_dir: None,
        }
    }

    pub fn with_snapshots(mut self, dir: PathBuf) -> Self {
        self.snapshot_dir = Some(dir);
        self
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn reference_radius(&self) -> ReferenceRadius {
        self.counter.classifier().reference_radius()
    }

    pub fn run<R: BufRead, W: Write>(&mut self, input: &mut R, out: &mut W) -> Result<SessionSummary> {
        let mut summary = SessionSummary::default();
        log::info!("session started on {}", self.source.describe());
        writeln!(out, "{}", HELP)?;

        while let Some(line) = read_line(input)? {
            if line.trim().is_empty() {
                continue;
            }
            match Command::parse(&line) {
                Some(Command::Scan) => {
                    summary.scans += 1;
                    if let Some(total) = self.scan(summary.scans, out)? {
                        summary.last_total = Some(total);
                    }
                }
                Some(Command::Configure) => self.configure(input, out)?,
                Some(Command::ToggleDebug) => {
                    self.debug = !self.debug;
                    if self.debug {
                        writeln!(out, "Entered debug mode")?;
                    } else {
                        writeln!(out, "Out of debug mode")?;
                    }
                }
                Some(Command::Help) => writeln!(out, "{}", HELP)?,
                Some(Command::Quit) => break,
                None => writeln!(out, "Unknown command {:?}. {}", line.trim(), HELP)?,
            }
        }

        writeln!(out, "Program ended.")?;
        Ok(summary)
    }

    fn scan<W: Write>(&mut self, scan_no: usize, out: &mut W) -> Result<Option<f64>> {
        writeln!(out, "Processing image...")?;
        let frame = match self.source.next_frame() {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("frame capture failed: {}", e);
                writeln!(out, "Image not captured: {}", e)?;
                return Ok(None);
            }
        };

        let (resized, report) = self.counter.count(&frame)?;
        let Some(report) = report else {
            writeln!(out, "No circles detected")?;
            return Ok(None);
        };

        report.write_text(out, &self.currency_symbol, self.debug)?;

        if let Some(dir) = &self.snapshot_dir {
            std::fs::create_dir_all(dir)?;
            let path = dir.join(format!("scan_{:03}.png", scan_no));
            self.counter
                .annotate(&resized, &report)
                .save(&path)
                .map_err(|e| anyhow::anyhow!("Failed to save {}: {}", path.display(), e))?;
            writeln!(out, "Saved {}", path.display())?;
        }

        writeln!(out, "Image processed")?;
        Ok(Some(report.total()))
    }

    fn configure<R: BufRead, W: Write>(&mut self, input: &mut R, out: &mut W) -> Result<()> {
        writeln!(out, "Current reference radius: {}", self.reference_radius())?;
        write!(out, "Enter new value: ")?;
        out.flush()?;

        let Some(line) = read_line(input)? else {
            return Ok(());
        };
        match line.parse::<ReferenceRadius>() {
            Ok(radius) => {
                self.counter.set_reference_radius(radius);
                log::info!("reference radius set to {}", radius);
                writeln!(out, "Reference radius set to {}", radius)?;
            }
            Err(e) if line.trim().parse::<f64>().is_err() => {
                log::debug!("{}", e);
                writeln!(out, "Not a number")?;
            }
            Err(e) => writeln!(out, "{}", e)?,
        }
        Ok(())
    }
}

fn read_line<R: BufRead>(input: &mut R) -> std::io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}
